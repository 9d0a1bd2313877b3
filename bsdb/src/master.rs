// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Single-row signals: which database is the master, and which one-shot data
//! migrations already ran.

use tracing::info;

use crate::catalog::{DATA_MIGRATION_RECORD, MASTER_DB};
use crate::query::{Filter, Select};
use crate::value::Row;
use crate::{DbError, Store, StoreTx};

/// Process key of the bucket size backfill.
pub const PROCESS_KEY_UPDATE_BUCKET_SIZE: &str = "update_bucket_size";

fn master_select() -> Select {
    Select::from(MASTER_DB).filter(Filter::new().eq("one_row_id", true))
}

/// Current value of the signal, `None` when the row does not exist.
pub async fn get_signal(store: &dyn Store) -> Result<Option<bool>, DbError> {
    match store.select_one(&master_select()).await? {
        Some(row) => Ok(Some(row.boolean("is_master")?)),
        None => Ok(None),
    }
}

/// Write the signal, updating only `is_master` if the row exists.
pub async fn set_signal(
    store: &dyn Store,
    is_master: bool,
) -> Result<(), DbError> {
    let mut tx = store.begin().await?;
    tx.upsert_by_columns(
        MASTER_DB,
        &["one_row_id"],
        Row::new()
            .with("one_row_id", true)
            .with("is_master", is_master),
        &["is_master"],
    )
    .await?;
    tx.commit().await?;
    info!("Set master_db signal to is_master={is_master}");
    Ok(())
}

/// Create the row with `is_master = true` when absent and return the
/// resulting signal.
pub async fn ensure_signal(store: &dyn Store) -> Result<bool, DbError> {
    if let Some(is_master) = get_signal(store).await? {
        return Ok(is_master);
    }
    let mut tx = store.begin().await?;
    // A concurrent boot may have created the row, keep its value
    tx.upsert_by_columns(
        MASTER_DB,
        &["one_row_id"],
        Row::new().with("one_row_id", true).with("is_master", true),
        &[],
    )
    .await?;
    tx.commit().await?;
    get_signal(store)
        .await?
        .ok_or_else(|| DbError::NotFound("master_db row".into()))
}

/// Whether the one-shot migration `process_key` completed.
pub async fn is_migration_completed(
    store: &dyn Store,
    process_key: &str,
) -> Result<bool, DbError> {
    let select = Select::from(DATA_MIGRATION_RECORD)
        .filter(Filter::new().eq("process_key", process_key));
    match store.select_one(&select).await? {
        Some(row) => row.boolean("is_completed"),
        None => Ok(false),
    }
}

/// Record the completion state of a one-shot migration.
pub async fn set_migration_completed(
    store: &dyn Store,
    process_key: &str,
    is_completed: bool,
) -> Result<(), DbError> {
    let mut tx = store.begin().await?;
    tx.upsert_by_columns(
        DATA_MIGRATION_RECORD,
        &["process_key"],
        Row::new()
            .with("process_key", process_key)
            .with("is_completed", is_completed),
        &["is_completed"],
    )
    .await?;
    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn test_ensure_creates_master_once() {
        let store = MemoryStore::new();
        assert_eq!(get_signal(&store).await.unwrap(), None);
        assert!(ensure_signal(&store).await.unwrap());

        set_signal(&store, false).await.unwrap();
        // A second boot keeps the operator's value
        assert!(!ensure_signal(&store).await.unwrap());
        assert_eq!(store.rows(MASTER_DB).len(), 1);
    }

    #[tokio::test]
    async fn test_migration_record() {
        let store = MemoryStore::new();
        let key = PROCESS_KEY_UPDATE_BUCKET_SIZE;
        assert!(!is_migration_completed(&store, key).await.unwrap());
        set_migration_completed(&store, key, true).await.unwrap();
        assert!(is_migration_completed(&store, key).await.unwrap());
        set_migration_completed(&store, key, true).await.unwrap();
        assert_eq!(store.rows(DATA_MIGRATION_RECORD).len(), 1);
    }
}
