// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! The single row recording the last committed block.

use crate::catalog::EPOCH;
use crate::models::{Epoch, FromRow};
use crate::query::{Filter, RowMutation, Select};
use crate::store::Lookup;
use crate::value::Row;
use crate::{DbError, Store};

/// Upsert of the epoch row for a block at `height`.
pub fn advance(height: u64, block_hash: &str, block_time: i64) -> RowMutation {
    RowMutation::upsert(
        EPOCH,
        &["one_row_id"],
        Row::new()
            .with("one_row_id", true)
            .with("block_height", height)
            .with("block_hash", block_hash)
            .with("update_time", block_time),
    )
}

fn select() -> Select {
    Select::from(EPOCH).filter(Filter::new().eq("one_row_id", true))
}

/// Last committed epoch, `None` on a fresh database.
pub async fn latest(store: &dyn Store) -> Result<Option<Epoch>, DbError> {
    store
        .select_one(&select())
        .await?
        .map(|row| Epoch::from_row(&row))
        .transpose()
}

/// Epoch as seen by an open transaction.
pub async fn latest_in(
    lookup: &mut dyn Lookup,
) -> Result<Option<Epoch>, DbError> {
    lookup
        .select_one(&select())
        .await?
        .map(|row| Epoch::from_row(&row))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreTx;
    use crate::MemoryStore;

    #[tokio::test]
    async fn test_single_row_advances() {
        let store = MemoryStore::new();
        assert!(latest(&store).await.unwrap().is_none());
        for h in 1..=3u64 {
            let mut tx = store.begin().await.unwrap();
            tx.apply(&advance(h, "0xab", 1_700_000_000 + h as i64))
                .await
                .unwrap();
            assert_eq!(
                latest_in(tx.as_lookup()).await.unwrap().unwrap().block_height,
                h as i64
            );
            tx.commit().await.unwrap();
        }
        let epoch = latest(&store).await.unwrap().unwrap();
        assert_eq!(epoch.block_height, 3);
        assert_eq!(epoch.update_time, 1_700_000_003);
        assert_eq!(store.rows(EPOCH).len(), 1);
    }
}
