// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! One-shot recomputation of the bucket size counters from the sealed
//! objects, for databases synced before the counters existed.

use std::collections::BTreeMap;

use bsdb::catalog::BUCKETS;
use bsdb::master::{self, PROCESS_KEY_UPDATE_BUCKET_SIZE};
use bsdb::models::OBJECT_STATUS_SEALED;
use bsdb::{shard, DbError, Filter, Order, Row, Select, Store};
use num_bigint::BigInt;
use tracing::info;

use crate::modules::charge_size;

const PAGE_SIZE: u64 = 1000;

#[derive(Default, Debug, Clone, PartialEq, Eq)]
struct Sizes {
    storage: BigInt,
    charge: BigInt,
}

async fn sum_shard(
    store: &dyn Store,
    table: &str,
    sizes: &mut BTreeMap<String, Sizes>,
) -> Result<(), DbError> {
    let mut from_id = 0i64;
    loop {
        let select = Select::from(table)
            .filter(
                Filter::new()
                    .eq("removed", false)
                    .eq("status", OBJECT_STATUS_SEALED)
                    .gte("id", from_id),
            )
            .order_by("id", Order::Asc)
            .limit(PAGE_SIZE);
        let rows = store.select(&select).await?;
        for row in &rows {
            let payload = row.uint("payload_size")?;
            let entry = sizes.entry(row.text("bucket_id")?).or_default();
            entry.storage += payload;
            entry.charge += charge_size(payload);
        }
        match rows.last() {
            Some(last) if rows.len() as u64 == PAGE_SIZE => {
                from_id = last.int("id")? + 1;
            }
            _ => return Ok(()),
        }
    }
}

/// Recompute `storage_size` and `charge_size` of every bucket holding a
/// sealed object, once per database. Returns whether anything ran.
pub async fn backfill_bucket_sizes(
    store: &dyn Store,
) -> Result<bool, DbError> {
    if master::is_migration_completed(store, PROCESS_KEY_UPDATE_BUCKET_SIZE)
        .await?
    {
        info!(event = "bucket size backfill skipped", reason = "completed");
        return Ok(false);
    }

    let mut sizes = BTreeMap::new();
    for table in shard::all_objects_tables() {
        sum_shard(store, &table, &mut sizes).await?;
    }

    let buckets: Vec<_> = sizes.into_iter().collect();
    for chunk in buckets.chunks(PAGE_SIZE as usize) {
        let mut tx = store.begin().await?;
        for (bucket_id, sizes) in chunk {
            tx.update_where(
                BUCKETS,
                Filter::new().eq("bucket_id", bucket_id),
                Row::new()
                    .with("storage_size", sizes.storage.to_string())
                    .with("charge_size", sizes.charge.to_string()),
            )
            .await?;
        }
        tx.commit().await?;
    }

    master::set_migration_completed(
        store,
        PROCESS_KEY_UPDATE_BUCKET_SIZE,
        true,
    )
    .await?;
    info!(event = "bucket size backfill done", buckets = buckets.len());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use bsdb::models::{Bucket, FromRow};
    use bsdb::MemoryStore;

    use super::*;
    use crate::modules::testing::*;

    #[tokio::test]
    async fn test_backfill_recomputes_once() {
        let (dispatcher, store) = setup().await;
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![
                vec![
                    create_bucket(1, "alpha"),
                    create_object(11, "alpha", "a.txt", 500_000),
                    create_object(12, "alpha", "b.txt", 10),
                    create_object(13, "alpha", "c.txt", 7),
                ],
                vec![
                    seal_object(11, "alpha", "a.txt"),
                    seal_object(12, "alpha", "b.txt"),
                ],
            ],
        )
        .await;

        // Corrupt the counters as an older syncer would have left them
        let mut tx = store.begin().await.unwrap();
        tx.update_where(
            BUCKETS,
            Filter::new().eq("bucket_name", "alpha"),
            Row::new()
                .with("storage_size", "0")
                .with("charge_size", "0"),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(backfill_bucket_sizes(&store).await.unwrap());
        let bucket = Bucket::from_row(&store.rows(BUCKETS)[0]).unwrap();
        assert_eq!(bucket.storage_size, "500010");
        assert_eq!(bucket.charge_size, "628000");

        assert!(!backfill_bucket_sizes(&store).await.unwrap());
    }

    #[tokio::test]
    async fn test_backfill_on_empty_db() {
        let store = MemoryStore::new();
        store
            .ensure_tables(&bsdb::catalog::all_tables())
            .await
            .unwrap();
        assert!(backfill_bucket_sizes(&store).await.unwrap());
        assert!(master::is_migration_completed(
            &store,
            PROCESS_KEY_UPDATE_BUCKET_SIZE
        )
        .await
        .unwrap());
    }
}
