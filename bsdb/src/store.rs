// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Persistence engine traits.
//!
//! A [`Store`] hands out one [`StoreTx`] per block. Nothing is
//! auto-committed: mutations applied to a transaction become visible to
//! readers only on [`StoreTx::commit`], and dropping a transaction without
//! committing discards them.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;

use crate::catalog::TableDef;
use crate::query::{Filter, RowMutation, Select};
use crate::value::Row;
use crate::DbError;

/// Read-only access, either to committed data or to a transaction's own
/// view of it.
#[async_trait]
pub trait Lookup: Send {
    async fn select(&mut self, select: &Select) -> Result<Vec<Row>, DbError>;

    async fn count(
        &mut self,
        table: &str,
        filter: &Filter,
    ) -> Result<u64, DbError>;

    async fn select_one(
        &mut self,
        select: &Select,
    ) -> Result<Option<Row>, DbError> {
        let rows = self.select(&select.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }
}

/// An open write transaction. Reads see the transaction's own writes.
#[async_trait]
pub trait StoreTx: Lookup {
    /// Execute a mutation, returning the number of affected rows.
    async fn apply(&mut self, mutation: &RowMutation) -> Result<u64, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;

    /// The transaction as a read-only handle.
    fn as_lookup(&mut self) -> &mut dyn Lookup;

    /// Insert `row`; on conflict by `keys` overwrite every other column.
    async fn upsert_by(
        &mut self,
        table: &str,
        keys: &[&str],
        row: Row,
    ) -> Result<u64, DbError> {
        self.apply(&RowMutation::upsert(table, keys, row)).await
    }

    /// Insert `row`; on conflict by `keys` overwrite only `update`.
    async fn upsert_by_columns(
        &mut self,
        table: &str,
        keys: &[&str],
        row: Row,
        update: &[&str],
    ) -> Result<u64, DbError> {
        self.apply(&RowMutation::upsert_columns(table, keys, row, update))
            .await
    }

    async fn update_where(
        &mut self,
        table: &str,
        filter: Filter,
        set: Row,
    ) -> Result<u64, DbError> {
        self.apply(&RowMutation::update_where(table, filter, set))
            .await
    }

    async fn batch_insert(
        &mut self,
        table: &str,
        keys: &[&str],
        rows: Vec<Row>,
    ) -> Result<u64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.apply(&RowMutation::batch_insert(table, keys, rows))
            .await
    }

    /// Delete rows matching any of `filters`.
    async fn batch_delete(
        &mut self,
        table: &str,
        filters: Vec<Filter>,
    ) -> Result<u64, DbError> {
        if filters.is_empty() {
            return Ok(0);
        }
        self.apply(&RowMutation::delete_any(table, filters)).await
    }
}

/// A database: transactions for the writer, pooled reads for the reader.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DbError>;

    async fn select(&self, select: &Select) -> Result<Vec<Row>, DbError>;

    async fn count(&self, table: &str, filter: &Filter)
        -> Result<u64, DbError>;

    /// Create the given tables and their indexes if missing.
    async fn ensure_tables(&self, tables: &[TableDef]) -> Result<(), DbError>;

    async fn select_one(&self, select: &Select) -> Result<Option<Row>, DbError> {
        let rows = self.select(&select.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }
}

/// Reject mutations that would touch a whole table by accident.
pub(crate) fn check_bounded(mutation: &RowMutation) -> Result<(), DbError> {
    let unbounded = match mutation {
        RowMutation::UpdateWhere { filter, .. } => filter.is_empty(),
        RowMutation::DeleteAny { filters, .. } => {
            filters.iter().any(Filter::is_empty)
        }
        RowMutation::Upsert { keys, .. }
        | RowMutation::BatchInsert { keys, .. } => keys.is_empty(),
    };
    if unbounded {
        return Err(DbError::Schema(format!(
            "{} on {} without a key or filter",
            mutation.op(),
            mutation.table()
        )));
    }
    Ok(())
}
