// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Dynamically typed cells and rows exchanged with the persistence engine.

use std::collections::btree_map;
use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::DbError;

/// Hex form of the all-zero 20 byte address, used as the group sentinel
/// account.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Hex form of the all-zero 32 byte hash.
pub const ZERO_HASH: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// A single column value.
///
/// Variants are ordered so that the derived `Ord` compares values of the same
/// kind naturally, which is what range filters need.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Render the value the way `FIND_IN_SET` and `LIKE` see it.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => i64::from(*b).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => hex::encode(b),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        // Heights, sizes and timestamps on chain stay far below i64::MAX
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style setter.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.0.insert(column.to_owned(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Copy every column of `other` into this row, overwriting.
    pub fn merge(&mut self, other: &Row) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    fn required(&self, column: &str) -> Result<&Value, DbError> {
        self.0
            .get(column)
            .ok_or_else(|| DbError::Decode(format!("missing column {column}")))
    }

    /// Text column; NULL decodes to the empty string.
    pub fn text(&self, column: &str) -> Result<String, DbError> {
        match self.required(column)? {
            Value::Text(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            other => Err(DbError::Decode(format!(
                "column {column} is not text: {other:?}"
            ))),
        }
    }

    /// Integer column; NULL decodes to zero.
    pub fn int(&self, column: &str) -> Result<i64, DbError> {
        match self.required(column)? {
            Value::Null => Ok(0),
            v => v.as_i64().ok_or_else(|| {
                DbError::Decode(format!("column {column} is not an integer"))
            }),
        }
    }

    pub fn uint(&self, column: &str) -> Result<u64, DbError> {
        let v = self.int(column)?;
        u64::try_from(v).map_err(|_| {
            DbError::Decode(format!("column {column} is negative: {v}"))
        })
    }

    pub fn boolean(&self, column: &str) -> Result<bool, DbError> {
        match self.required(column)? {
            Value::Null => Ok(false),
            v => v.as_bool().ok_or_else(|| {
                DbError::Decode(format!("column {column} is not a boolean"))
            }),
        }
    }

    pub fn bytes(&self, column: &str) -> Result<Vec<u8>, DbError> {
        match self.required(column)? {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Null => Ok(vec![]),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            other => Err(DbError::Decode(format!(
                "column {column} is not binary: {other:?}"
            ))),
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Comma separated list of uint32 as stored in `secondary_sp_ids` and
/// `global_virtual_group_ids`.
///
/// The column is only ever searched with a contains primitive and must never
/// be used for ordering.
pub fn join_u32_csv(values: &[u32]) -> String {
    values
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn split_u32_csv(csv: &str) -> Result<Vec<u32>, DbError> {
    if csv.is_empty() {
        return Ok(vec![]);
    }
    csv.split(',')
        .map(|s| {
            s.trim().parse::<u32>().map_err(|e| {
                DbError::Decode(format!("invalid uint32 list '{csv}': {e}"))
            })
        })
        .collect()
}

/// Whether the comma separated `csv` contains `needle` as a whole element.
pub fn csv_contains(csv: &str, needle: &str) -> bool {
    !csv.is_empty() && csv.split(',').any(|s| s == needle)
}

/// Checksums are stored as a comma separated list of base64 blobs.
pub fn join_checksums(checksums: &[Vec<u8>]) -> String {
    checksums
        .iter()
        .map(|c| STANDARD.encode(c))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn split_checksums(csv: &str) -> Result<Vec<Vec<u8>>, DbError> {
    if csv.is_empty() {
        return Ok(vec![]);
    }
    csv.split(',')
        .map(|s| {
            STANDARD.decode(s).map_err(|e| {
                DbError::Decode(format!("invalid checksum '{s}': {e}"))
            })
        })
        .collect()
}

/// Comma separated list of strings (statement resources). Commas inside a
/// resource are not expected on chain.
pub fn join_strings(values: &[String]) -> String {
    values.join(",")
}

pub fn split_strings(csv: &str) -> Vec<String> {
    if csv.is_empty() {
        return vec![];
    }
    csv.split(',').map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_builder_and_getters() {
        let row = Row::new()
            .with("bucket_name", "b")
            .with("removed", false)
            .with("payload_size", 42u64)
            .with("extra", Option::<String>::None);

        assert_eq!(row.text("bucket_name").unwrap(), "b");
        assert!(!row.boolean("removed").unwrap());
        assert_eq!(row.uint("payload_size").unwrap(), 42);
        assert_eq!(row.text("extra").unwrap(), "");
        assert!(row.text("missing").is_err());
        assert!(row.int("bucket_name").is_err());
    }

    #[test]
    fn test_value_ordering_within_kind() {
        assert!(Value::from("a/") < Value::from("a/b"));
        assert!(Value::Int(2) < Value::Int(10));
        assert!(Value::Null < Value::Int(i64::MIN));
    }

    #[test]
    fn test_u32_csv() {
        assert_eq!(join_u32_csv(&[1, 20, 3]), "1,20,3");
        assert_eq!(split_u32_csv("1,20,3").unwrap(), vec![1, 20, 3]);
        assert!(split_u32_csv("").unwrap().is_empty());
        assert!(split_u32_csv("1,x").is_err());
    }

    #[test]
    fn test_csv_contains_matches_whole_elements() {
        assert!(csv_contains("1,20,3", "20"));
        assert!(!csv_contains("1,20,3", "2"));
        assert!(!csv_contains("", ""));
    }

    #[test]
    fn test_checksums() {
        let checksums = vec![vec![1u8, 2, 3], vec![255u8; 4]];
        let csv = join_checksums(&checksums);
        assert_eq!(csv, "AQID,/////w==");
        assert_eq!(split_checksums(&csv).unwrap(), checksums);
        assert!(split_checksums("").unwrap().is_empty());
    }
}
