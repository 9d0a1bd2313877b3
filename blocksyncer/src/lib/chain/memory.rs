// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Block, BlockData, BlockResults, ChainClient, TxResult};
use crate::error::SyncError;

#[derive(Default)]
struct State {
    blocks: BTreeMap<u64, BlockData>,
    /// Number of upcoming calls that fail with a transient error.
    failures: u32,
    calls: u64,
}

/// A chain held in memory. Clones share the same blocks.
#[derive(Clone, Default)]
pub struct MemoryChain {
    state: Arc<Mutex<State>>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append or replace the block at `block.height`.
    pub fn push(&self, block: BlockData) {
        self.state.lock().blocks.insert(block.height, block);
    }

    /// Make the next `times` calls fail as if the node was unreachable.
    pub fn fail_next_calls(&self, times: u32) {
        self.state.lock().failures = times;
    }

    /// Number of RPC calls served or failed so far.
    pub fn calls(&self) -> u64 {
        self.state.lock().calls
    }

    fn with_block<T>(
        &self,
        height: u64,
        f: impl FnOnce(&BlockData) -> T,
    ) -> Result<T, SyncError> {
        let mut state = self.state.lock();
        state.calls += 1;
        if state.failures > 0 {
            state.failures -= 1;
            return Err(SyncError::TransientRpc("connection refused".into()));
        }
        state
            .blocks
            .get(&height)
            .map(f)
            .ok_or_else(|| {
                SyncError::TransientRpc(format!("height {height} not available"))
            })
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    async fn latest_height(&self) -> Result<u64, SyncError> {
        let mut state = self.state.lock();
        state.calls += 1;
        if state.failures > 0 {
            state.failures -= 1;
            return Err(SyncError::TransientRpc("connection refused".into()));
        }
        Ok(state.blocks.keys().next_back().copied().unwrap_or_default())
    }

    async fn block(&self, height: u64) -> Result<Block, SyncError> {
        self.with_block(height, |b| Block {
            height: b.height,
            hash: b.hash.clone(),
            time: b.time,
            tx_hashes: b.txs.iter().map(|tx| tx.hash.clone()).collect(),
        })
    }

    async fn block_results(
        &self,
        height: u64,
    ) -> Result<BlockResults, SyncError> {
        self.with_block(height, |b| BlockResults {
            height: b.height,
            txs_results: b
                .txs
                .iter()
                .map(|tx| TxResult {
                    code: 0,
                    events: tx.events.clone(),
                })
                .collect(),
            block_events: b.block_events.clone(),
        })
    }
}
