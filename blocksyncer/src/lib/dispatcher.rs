// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Per-block execution: one transaction, events in chain order, the epoch
//! row last.

use std::sync::Arc;

use bsdb::epoch;
use bsdb::retry::RetryPolicy;
use bsdb::{Store, StoreTx};
use tracing::{debug, warn};

use crate::chain::{AbciEvent, BlockData};
use crate::context::{BlockContext, BlockStats};
use crate::error::SyncError;
use crate::events::Event;
use crate::registry::{Handler, Registry};

pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Process `block`, retrying the whole block on transient database
    /// errors as allowed by `policy`.
    pub async fn process_block_with_retry(
        &self,
        store: &dyn Store,
        block: &BlockData,
        policy: &RetryPolicy,
    ) -> Result<BlockStats, SyncError> {
        policy
            .run(&format!("block {}", block.height), |_| {
                self.process_block(store, block)
            })
            .await
    }

    /// Materialize `block` in a single transaction. Nothing is committed
    /// unless every event of the block was handled.
    pub async fn process_block(
        &self,
        store: &dyn Store,
        block: &BlockData,
    ) -> Result<BlockStats, SyncError> {
        let mut tx = store.begin().await?;
        let mut ctx = BlockContext::new(block.height, &block.hash, block.time);

        match self.run(&mut ctx, tx.as_mut(), block).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(ctx.stats)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!("Rollback of block {} failed: {rb}", block.height);
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        block: &BlockData,
    ) -> Result<(), SyncError> {
        for block_tx in &block.txs {
            for (index, event) in block_tx.events.iter().enumerate() {
                ctx.at_event(&block_tx.hash, index as u32);
                self.dispatch(ctx, tx, event).await?;
            }
        }
        // Events outside transactions are attributed to the block itself
        for (index, event) in block.block_events.iter().enumerate() {
            ctx.at_event(&block.hash, index as u32);
            self.dispatch(ctx, tx, event).await?;
        }

        match epoch::latest_in(tx.as_lookup()).await? {
            Some(current) if current.block_height > block.height as i64 => {
                // Replay of an already committed block: rows are rewritten,
                // the epoch never goes back
                warn!(
                    "Replayed block {} below epoch {}",
                    block.height, current.block_height
                );
            }
            _ => {
                tx.apply(&epoch::advance(block.height, &block.hash, block.time))
                    .await?;
            }
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        raw: &AbciEvent,
    ) -> Result<(), SyncError> {
        ctx.stats.events_seen += 1;
        let modules = self.registry.modules_for(&raw.kind);
        if modules.is_empty() {
            return Ok(());
        }
        let event = Event::parse(raw)?.ok_or_else(|| {
            SyncError::parse(&raw.kind, "no typed form for a routed event")
        })?;
        debug!(
            height = ctx.height,
            tx = ctx.tx_hash,
            index = ctx.event_index,
            event = event.name(),
            "Dispatching event"
        );

        for module in modules {
            match module.handler() {
                Handler::Extract(handler) => {
                    let mutations =
                        handler.extract(ctx, tx.as_lookup(), &event).await?;
                    for mutation in &mutations {
                        tx.apply(mutation).await?;
                    }
                    ctx.stats.mutations += mutations.len() as u64;
                }
                Handler::Direct(handler) => {
                    handler.handle(ctx, tx, &event).await?
                }
            }
        }
        ctx.stats.events_handled += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bsdb::catalog::{BUCKETS, EPOCH};
    use bsdb::{DbError, MemoryStore};

    use super::*;
    use crate::chain::{BlockTx, EventAttribute};
    use crate::modules;

    fn create_bucket(id: &str, name: &str) -> AbciEvent {
        AbciEvent::new("greenfield.storage.EventCreateBucket")
            .attr("bucket_id", &format!("\"{id}\""))
            .attr("bucket_name", &format!("\"{name}\""))
            .attr("owner", "\"0x00000000000000000000000000000000000000aa\"")
    }

    fn block(height: u64, events: Vec<AbciEvent>) -> BlockData {
        BlockData {
            height,
            hash: format!("0x{height:064x}"),
            time: 1_700_000_000 + height as i64,
            txs: vec![BlockTx {
                hash: format!("0x{:064x}", 1000 + height),
                events,
            }],
            block_events: vec![],
        }
    }

    async fn dispatcher() -> (Dispatcher, MemoryStore) {
        let store = MemoryStore::new();
        let registry = Arc::new(modules::default_registry());
        registry.prepare_tables(&store).await.unwrap();
        (Dispatcher::new(registry), store)
    }

    #[tokio::test]
    async fn test_block_commits_rows_and_epoch() {
        let (dispatcher, store) = dispatcher().await;
        let stats = dispatcher
            .process_block(
                &store,
                &block(
                    1,
                    vec![
                        AbciEvent::new("message"),
                        create_bucket("1", "b"),
                    ],
                ),
            )
            .await
            .unwrap();
        assert_eq!(stats.events_seen, 2);
        assert_eq!(stats.events_handled, 1);
        assert_eq!(store.rows(BUCKETS).len(), 1);
        let epoch = epoch::latest(&store).await.unwrap().unwrap();
        assert_eq!(epoch.block_height, 1);
        assert_eq!(epoch.update_time, 1_700_000_001);
    }

    #[tokio::test]
    async fn test_unparsable_event_aborts_block() {
        let (dispatcher, store) = dispatcher().await;
        let mut bad = create_bucket("2", "c");
        bad.attributes.push(EventAttribute {
            key: "charged_read_quota".into(),
            value: "\"lots\"".into(),
        });
        let err = dispatcher
            .process_block(&store, &block(1, vec![create_bucket("1", "b"), bad]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "parse_event");
        assert!(store.rows(BUCKETS).is_empty());
        assert!(store.rows(EPOCH).is_empty());
    }

    #[tokio::test]
    async fn test_deadlocked_commit_is_retried() {
        let (dispatcher, store) = dispatcher().await;
        store.fail_next_commits(DbError::DeadlockRetry("1213".into()), 2);
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: std::time::Duration::from_millis(1),
            max_backoff: std::time::Duration::from_millis(2),
        };
        dispatcher
            .process_block_with_retry(
                &store,
                &block(1, vec![create_bucket("1", "b")]),
                &policy,
            )
            .await
            .unwrap();
        assert_eq!(store.rows(BUCKETS).len(), 1);
        assert_eq!(
            epoch::latest(&store).await.unwrap().unwrap().block_height,
            1
        );
    }

    #[tokio::test]
    async fn test_replay_keeps_epoch() {
        let (dispatcher, store) = dispatcher().await;
        for h in [1, 2, 1] {
            dispatcher
                .process_block(&store, &block(h, vec![create_bucket("1", "b")]))
                .await
                .unwrap();
        }
        let epoch = epoch::latest(&store).await.unwrap().unwrap();
        assert_eq!(epoch.block_height, 2);
    }
}
