// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Engine independent description of reads and writes.
//!
//! Handlers never build SQL. They describe what must happen as a
//! [`RowMutation`] (or a [`Select`] for reads) and the store engine renders
//! it, either to MySQL statements or to operations on the in-memory twin.

use std::cmp::Ordering;

use crate::value::{csv_contains, Row, Value};

/// A single condition on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cond {
    Eq(String, Value),
    In(String, Vec<Value>),
    /// `LIKE 'prefix%'`, the prefix is matched literally.
    LikePrefix(String, String),
    Gte(String, Value),
    Lte(String, Value),
    /// Whole-element match inside a comma separated column
    /// (`FIND_IN_SET`).
    CsvContains(String, Value),
}

impl Cond {
    pub fn column(&self) -> &str {
        match self {
            Cond::Eq(c, _)
            | Cond::In(c, _)
            | Cond::LikePrefix(c, _)
            | Cond::Gte(c, _)
            | Cond::Lte(c, _)
            | Cond::CsvContains(c, _) => c,
        }
    }

    fn matches(&self, row: &Row) -> bool {
        let cell = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Cond::Eq(_, v) => compare(cell, v) == Ordering::Equal,
            Cond::In(_, vs) => {
                vs.iter().any(|v| compare(cell, v) == Ordering::Equal)
            }
            Cond::LikePrefix(_, prefix) => {
                cell.as_str().is_some_and(|s| s.starts_with(prefix.as_str()))
            }
            Cond::Gte(_, v) => {
                !cell.is_null() && compare(cell, v) != Ordering::Less
            }
            Cond::Lte(_, v) => {
                !cell.is_null() && compare(cell, v) != Ordering::Greater
            }
            Cond::CsvContains(_, v) => {
                cell.as_str().is_some_and(|s| csv_contains(s, &v.to_text()))
            }
        }
    }
}

/// Compare two cells the way MySQL compares a column with a bound value:
/// booleans are integers and text compares byte-wise (`utf8mb4_bin`).
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.cmp(b),
        },
    }
}

/// A conjunction of conditions. The empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter(Vec<Cond>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.push(Cond::Eq(column.to_owned(), value.into()));
        self
    }

    pub fn is_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.0.push(Cond::In(column.to_owned(), values));
        self
    }

    pub fn like_prefix(mut self, column: &str, prefix: &str) -> Self {
        self.0
            .push(Cond::LikePrefix(column.to_owned(), prefix.to_owned()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.push(Cond::Gte(column.to_owned(), value.into()));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.push(Cond::Lte(column.to_owned(), value.into()));
        self
    }

    pub fn csv_contains(
        mut self,
        column: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.0.push(Cond::CsvContains(column.to_owned(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[Cond] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.0.iter().all(|c| c.matches(row))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// A read of full rows from one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    pub filter: Filter,
    pub order_by: Vec<(String, Order)>,
    pub limit: Option<u64>,
}

impl Select {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_owned(),
            filter: Filter::new(),
            order_by: vec![],
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.order_by.push((column.to_owned(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sort rows by the order-by clause, then truncate to the limit.
    pub fn sort_and_limit(&self, rows: &mut Vec<Row>) {
        rows.sort_by(|a, b| {
            for (column, order) in &self.order_by {
                let x = a.get(column).unwrap_or(&Value::Null);
                let y = b.get(column).unwrap_or(&Value::Null);
                let ord = match order {
                    Order::Asc => compare(x, y),
                    Order::Desc => compare(y, x),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        if let Some(limit) = self.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
    }
}

/// Columns to overwrite when an upsert hits an existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Every column of the row except the conflict keys.
    All,
    /// Only the listed columns.
    Only(Vec<String>),
}

impl Update {
    /// Whether `column` is overwritten on conflict, given the conflict keys.
    pub fn touches(&self, column: &str, keys: &[String]) -> bool {
        match self {
            Update::All => !keys.iter().any(|k| k == column),
            Update::Only(cols) => cols.iter().any(|c| c == column),
        }
    }
}

/// A write, rendered and executed by the store engine inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowMutation {
    Upsert {
        table: String,
        keys: Vec<String>,
        row: Row,
        update: Update,
    },
    UpdateWhere {
        table: String,
        filter: Filter,
        set: Row,
    },
    /// Multi-row insert. A row colliding on a unique key replaces the
    /// non-key columns of the existing row.
    BatchInsert {
        table: String,
        keys: Vec<String>,
        rows: Vec<Row>,
    },
    /// Delete rows matching any of the filters.
    DeleteAny {
        table: String,
        filters: Vec<Filter>,
    },
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_owned()).collect()
}

impl RowMutation {
    pub fn upsert(table: &str, keys: &[&str], row: Row) -> Self {
        RowMutation::Upsert {
            table: table.to_owned(),
            keys: owned(keys),
            row,
            update: Update::All,
        }
    }

    pub fn upsert_columns(
        table: &str,
        keys: &[&str],
        row: Row,
        update: &[&str],
    ) -> Self {
        RowMutation::Upsert {
            table: table.to_owned(),
            keys: owned(keys),
            row,
            update: Update::Only(owned(update)),
        }
    }

    pub fn update_where(table: &str, filter: Filter, set: Row) -> Self {
        RowMutation::UpdateWhere {
            table: table.to_owned(),
            filter,
            set,
        }
    }

    pub fn batch_insert(table: &str, keys: &[&str], rows: Vec<Row>) -> Self {
        RowMutation::BatchInsert {
            table: table.to_owned(),
            keys: owned(keys),
            rows,
        }
    }

    pub fn delete_any(table: &str, filters: Vec<Filter>) -> Self {
        RowMutation::DeleteAny {
            table: table.to_owned(),
            filters,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            RowMutation::Upsert { table, .. }
            | RowMutation::UpdateWhere { table, .. }
            | RowMutation::BatchInsert { table, .. }
            | RowMutation::DeleteAny { table, .. } => table,
        }
    }

    /// Short operation name, used in logs.
    pub fn op(&self) -> &'static str {
        match self {
            RowMutation::Upsert { .. } => "upsert",
            RowMutation::UpdateWhere { .. } => "update_where",
            RowMutation::BatchInsert { .. } => "batch_insert",
            RowMutation::DeleteAny { .. } => "batch_delete",
        }
    }
}
