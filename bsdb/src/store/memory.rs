// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! In-memory twin of the MySQL engine.
//!
//! Tables of the catalog exist implicitly. A transaction works on a private
//! copy of the whole state which replaces the shared state on commit, so a
//! failed block leaves nothing behind. Column defaults, unique keys and
//! upsert semantics follow the MySQL rendering.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::{check_bounded, Lookup, Store, StoreTx};
use crate::catalog::{self, ColumnType, TableDef};
use crate::query::{compare, Filter, RowMutation, Select, Update};
use crate::value::{Row, Value};
use crate::DbError;

#[derive(Debug, Clone, Default)]
struct State {
    tables: BTreeMap<String, Vec<Row>>,
    auto_ids: BTreeMap<String, i64>,
}

/// In-memory [`Store`], cheap to clone; clones share their data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    commit_faults: Arc<Mutex<VecDeque<DbError>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` commits fail with `err`.
    pub fn fail_next_commits(&self, err: DbError, times: usize) {
        let mut faults = self.commit_faults.lock();
        faults.extend(std::iter::repeat(err).take(times));
    }

    /// Committed rows of `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Every non-empty table with its committed rows.
    pub fn dump(&self) -> BTreeMap<String, Vec<Row>> {
        self.state
            .lock()
            .tables
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(t, rows)| (t.clone(), rows.clone()))
            .collect()
    }
}

fn table_def(name: &str) -> Result<&'static TableDef, DbError> {
    catalog::table(name)
        .ok_or_else(|| DbError::Schema(format!("unknown table {name}")))
}

/// Check `row` only names catalog columns and coerce values to the column
/// type the way MySQL stores them.
fn normalize(def: &TableDef, row: &Row) -> Result<Row, DbError> {
    row.iter()
        .map(|(name, value)| {
            let column = def.column(name).ok_or_else(|| {
                DbError::Schema(format!("unknown column {}.{name}", def.name))
            })?;
            let value = match (column.col_type, value) {
                (ColumnType::Bool, Value::Int(i)) => Value::Bool(*i != 0),
                (ColumnType::BigInt, Value::Bool(b)) => Value::Int((*b).into()),
                _ => value.clone(),
            };
            Ok((name.clone(), value))
        })
        .collect()
}

fn same_key(a: &Row, b: &Row, key: &[&str]) -> bool {
    key.iter().all(|c| {
        let x = a.get(c).unwrap_or(&Value::Null);
        let y = b.get(c).unwrap_or(&Value::Null);
        // NULLs never collide in a unique index
        !x.is_null() && compare(x, y).is_eq()
    })
}

/// Position of the first row, other than `skip`, colliding with `row` on any
/// unique key.
fn find_conflict(
    def: &TableDef,
    rows: &[Row],
    row: &Row,
    skip: Option<usize>,
) -> Option<usize> {
    let keys = def.unique_keys();
    rows.iter().enumerate().position(|(i, existing)| {
        Some(i) != skip && keys.iter().any(|k| same_key(existing, row, k))
    })
}

impl State {
    fn table_mut(&mut self, name: &str) -> &mut Vec<Row> {
        self.tables.entry(name.to_owned()).or_default()
    }

    fn with_defaults(&mut self, def: &TableDef, row: Row) -> Row {
        let mut full = Row::new();
        for column in &def.columns {
            full.set(column.name, column.col_type.default_value());
        }
        full.merge(&row);
        if let Some(id) = def.auto_increment() {
            if full.get(id).and_then(Value::as_i64).unwrap_or(0) == 0 {
                let next = self.auto_ids.entry(def.name.clone()).or_insert(0);
                *next += 1;
                full.set(id, *next);
            }
        }
        full
    }

    fn upsert(
        &mut self,
        table: &str,
        keys: &[String],
        row: &Row,
        update: &Update,
    ) -> Result<u64, DbError> {
        let def = table_def(table)?;
        let row = normalize(def, row)?;
        let mut candidate = Row::new();
        for column in &def.columns {
            candidate.set(column.name, column.col_type.default_value());
        }
        candidate.merge(&row);

        let rows = self.table_mut(table);
        match find_conflict(def, rows, &candidate, None) {
            Some(i) => {
                let mut updated = rows[i].clone();
                for (column, value) in row.iter() {
                    if update.touches(column, keys) {
                        updated.set(column, value.clone());
                    }
                }
                if updated == rows[i] {
                    return Ok(0);
                }
                if find_conflict(def, rows, &updated, Some(i)).is_some() {
                    return Err(DbError::Conflict(format!(
                        "update of {table} collides on a unique key"
                    )));
                }
                rows[i] = updated;
                Ok(2)
            }
            None => {
                let full = self.with_defaults(def, row);
                self.table_mut(table).push(full);
                Ok(1)
            }
        }
    }

    fn update_where(
        &mut self,
        table: &str,
        filter: &Filter,
        set: &Row,
    ) -> Result<u64, DbError> {
        let def = table_def(table)?;
        let set = normalize(def, set)?;
        let rows = self.table_mut(table);
        let mut affected = 0;
        for i in 0..rows.len() {
            if !filter.matches(&rows[i]) {
                continue;
            }
            let mut updated = rows[i].clone();
            updated.merge(&set);
            if updated == rows[i] {
                continue;
            }
            if find_conflict(def, rows, &updated, Some(i)).is_some() {
                return Err(DbError::Conflict(format!(
                    "update of {table} collides on a unique key"
                )));
            }
            rows[i] = updated;
            affected += 1;
        }
        Ok(affected)
    }

    fn delete_any(
        &mut self,
        table: &str,
        filters: &[Filter],
    ) -> Result<u64, DbError> {
        table_def(table)?;
        let rows = self.table_mut(table);
        let before = rows.len();
        rows.retain(|r| !filters.iter().any(|f| f.matches(r)));
        Ok((before - rows.len()) as u64)
    }

    fn apply(&mut self, mutation: &RowMutation) -> Result<u64, DbError> {
        check_bounded(mutation)?;
        match mutation {
            RowMutation::Upsert {
                table,
                keys,
                row,
                update,
            } => self.upsert(table, keys, row, update),
            RowMutation::UpdateWhere { table, filter, set } => {
                self.update_where(table, filter, set)
            }
            RowMutation::BatchInsert { table, keys, rows } => {
                let mut affected = 0;
                for row in rows {
                    affected += self.upsert(table, keys, row, &Update::All)?;
                }
                Ok(affected)
            }
            RowMutation::DeleteAny { table, filters } => {
                self.delete_any(table, filters)
            }
        }
    }

    fn select(&self, select: &Select) -> Result<Vec<Row>, DbError> {
        table_def(&select.table)?;
        let mut rows: Vec<Row> = self
            .tables
            .get(&select.table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| select.filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        select.sort_and_limit(&mut rows);
        Ok(rows)
    }

    fn count(&self, table: &str, filter: &Filter) -> Result<u64, DbError> {
        table_def(table)?;
        Ok(self
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).count())
            .unwrap_or_default() as u64)
    }
}

/// Transaction over a private copy of the store state.
pub struct MemoryTx {
    store: MemoryStore,
    work: State,
}

#[async_trait]
impl Lookup for MemoryTx {
    async fn select(&mut self, select: &Select) -> Result<Vec<Row>, DbError> {
        self.work.select(select)
    }

    async fn count(
        &mut self,
        table: &str,
        filter: &Filter,
    ) -> Result<u64, DbError> {
        self.work.count(table, filter)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn apply(&mut self, mutation: &RowMutation) -> Result<u64, DbError> {
        let affected = self.work.apply(mutation)?;
        debug!(
            op = mutation.op(),
            table = mutation.table(),
            affected,
            "Applied mutation"
        );
        Ok(affected)
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let MemoryTx { store, work } = *self;
        let fault = store.commit_faults.lock().pop_front();
        if let Some(err) = fault {
            return Err(err);
        }
        *store.state.lock() = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        Ok(())
    }

    fn as_lookup(&mut self) -> &mut dyn Lookup {
        self
    }
}

/// Committed reads, detached from the shared state lock.
struct Snapshot(State);

#[async_trait]
impl Lookup for Snapshot {
    async fn select(&mut self, select: &Select) -> Result<Vec<Row>, DbError> {
        self.0.select(select)
    }

    async fn count(
        &mut self,
        table: &str,
        filter: &Filter,
    ) -> Result<u64, DbError> {
        self.0.count(table, filter)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DbError> {
        let work = self.state.lock().clone();
        Ok(Box::new(MemoryTx {
            store: self.clone(),
            work,
        }))
    }

    async fn select(&self, select: &Select) -> Result<Vec<Row>, DbError> {
        self.state.lock().select(select)
    }

    async fn count(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<u64, DbError> {
        self.state.lock().count(table, filter)
    }

    async fn ensure_tables(&self, tables: &[TableDef]) -> Result<(), DbError> {
        let mut state = self.state.lock();
        for def in tables {
            table_def(&def.name)?;
            state.table_mut(&def.name);
        }
        Ok(())
    }
}

impl MemoryStore {
    /// A read handle over the currently committed data.
    pub fn snapshot(&self) -> Box<dyn Lookup> {
        Box::new(Snapshot(self.state.lock().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BUCKETS, EPOCH, GROUPS, STATEMENTS};

    fn bucket(id: &str, name: &str) -> Row {
        Row::new()
            .with("bucket_id", id)
            .with("bucket_name", name)
            .with("status", "CREATED")
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.upsert_by(BUCKETS, &["bucket_id"], bucket("0x01", "b"))
                .await
                .unwrap(),
            1
        );
        let row = bucket("0x01", "b").with("status", "DISCONTINUED");
        assert_eq!(tx.upsert_by(BUCKETS, &["bucket_id"], row).await.unwrap(), 2);
        tx.commit().await.unwrap();

        let rows = store.rows(BUCKETS);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("status").unwrap(), "DISCONTINUED");
        assert_eq!(rows[0].int("id").unwrap(), 1);
        // Defaults are filled from the catalog
        assert_eq!(rows[0].text("storage_size").unwrap(), "0");
        assert!(!rows[0].boolean("removed").unwrap());
    }

    #[tokio::test]
    async fn test_upsert_columns_only_touches_whitelist() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.upsert_by(BUCKETS, &["bucket_id"], bucket("0x01", "b"))
            .await
            .unwrap();
        let row = bucket("0x01", "b")
            .with("status", "MIGRATING")
            .with("visibility", "PUBLIC_READ");
        tx.upsert_by_columns(BUCKETS, &["bucket_id"], row, &["visibility"])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let rows = store.rows(BUCKETS);
        assert_eq!(rows[0].text("status").unwrap(), "CREATED");
        assert_eq!(rows[0].text("visibility").unwrap(), "PUBLIC_READ");
    }

    #[tokio::test]
    async fn test_conflict_on_other_unique_key() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.upsert_by(BUCKETS, &["bucket_id"], bucket("0x01", "b"))
            .await
            .unwrap();
        tx.upsert_by(BUCKETS, &["bucket_id"], bucket("0x02", "c"))
            .await
            .unwrap();
        let err = tx
            .update_where(
                BUCKETS,
                Filter::new().eq("bucket_id", "0x02"),
                Row::new().with("bucket_name", "b"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_nothing() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.upsert_by(BUCKETS, &["bucket_id"], bucket("0x01", "b"))
                .await
                .unwrap();
            // Reads see the transaction's own writes
            assert_eq!(tx.count(BUCKETS, &Filter::new()).await.unwrap(), 1);
            tx.rollback().await.unwrap();
        }
        assert!(store.rows(BUCKETS).is_empty());
        assert_eq!(store.count(BUCKETS, &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_fault_discards_block() {
        let store = MemoryStore::new();
        store.fail_next_commits(DbError::DeadlockRetry("1213".into()), 1);
        let mut tx = store.begin().await.unwrap();
        tx.upsert_by(EPOCH, &["one_row_id"], Row::new().with("one_row_id", true))
            .await
            .unwrap();
        assert!(tx.commit().await.unwrap_err().is_retryable());
        assert!(store.rows(EPOCH).is_empty());

        let mut tx = store.begin().await.unwrap();
        tx.upsert_by(EPOCH, &["one_row_id"], Row::new().with("one_row_id", true))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.rows(EPOCH).len(), 1);
    }

    #[tokio::test]
    async fn test_batch_insert_replays_idempotently() {
        let store = MemoryStore::new();
        let statements = |effect: &str| {
            (0..3)
                .map(|i| {
                    Row::new()
                        .with("policy_id", "0x0a")
                        .with("statement_index", i as i64)
                        .with("effect", effect)
                })
                .collect::<Vec<_>>()
        };
        for effect in ["ALLOW", "DENY"] {
            let mut tx = store.begin().await.unwrap();
            tx.batch_insert(
                STATEMENTS,
                &["policy_id", "statement_index"],
                statements(effect),
            )
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }
        let rows = store.rows(STATEMENTS);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.text("effect").unwrap() == "DENY"));
    }

    #[tokio::test]
    async fn test_batch_delete_and_bounds() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for account in ["0xa1", "0xa2", "0xa3"] {
            tx.upsert_by(
                GROUPS,
                &["group_id", "account_id"],
                Row::new().with("group_id", "0x02").with("account_id", account),
            )
            .await
            .unwrap();
        }
        let deleted = tx
            .batch_delete(
                GROUPS,
                vec![
                    Filter::new().eq("account_id", "0xa1"),
                    Filter::new().eq("account_id", "0xa3"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(tx
            .batch_delete(GROUPS, vec![Filter::new()])
            .await
            .is_err());
        assert!(tx
            .update_where(GROUPS, Filter::new(), Row::new().with("removed", true))
            .await
            .is_err());
        tx.commit().await.unwrap();
        assert_eq!(store.rows(GROUPS).len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_table_and_column() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .upsert_by("nope", &["id"], Row::new().with("id", 1i64))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "schema_error");
        let err = tx
            .upsert_by(BUCKETS, &["bucket_id"], bucket("0x01", "b").with("x", 1i64))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "schema_error");
    }
}
