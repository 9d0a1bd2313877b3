// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Access to the chain node.
//!
//! The driver only needs three things from a node: its latest height, a
//! block header with the hashes of its transactions, and the events each
//! transaction emitted. [`ChainClient`] is that contract; [`rpc::RpcClient`]
//! implements it over CometBFT JSON-RPC and [`memory::MemoryChain`] serves
//! prepared blocks to tests.

pub mod memory;
pub mod rpc;

use async_trait::async_trait;

use crate::error::SyncError;

/// A `{key, value}` pair of an ABCI event. Values of typed events are JSON
/// documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// An event as emitted by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbciEvent {
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

impl AbciEvent {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            attributes: vec![],
        }
    }

    pub fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push(EventAttribute {
            key: key.to_owned(),
            value: value.into(),
        });
        self
    }
}

/// Header fields the syncer records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub height: u64,
    /// `0x` prefixed lowercase hex.
    pub hash: String,
    /// Unix seconds.
    pub time: i64,
    /// Hashes of the transactions, in block order.
    pub tx_hashes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxResult {
    pub code: u32,
    pub events: Vec<AbciEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockResults {
    pub height: u64,
    /// One entry per transaction, in block order.
    pub txs_results: Vec<TxResult>,
    /// Events emitted outside of any transaction (begin, end and finalize
    /// block).
    pub block_events: Vec<AbciEvent>,
}

/// A successful transaction and its events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTx {
    pub hash: String,
    pub events: Vec<AbciEvent>,
}

/// Everything the dispatcher needs to process one height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
    pub height: u64,
    pub hash: String,
    pub time: i64,
    pub txs: Vec<BlockTx>,
    pub block_events: Vec<AbciEvent>,
}

impl BlockData {
    /// Join a header with its results. Failed transactions emit no state
    /// change and are dropped.
    pub fn assemble(
        block: Block,
        results: BlockResults,
    ) -> Result<Self, SyncError> {
        if block.height != results.height {
            return Err(SyncError::InvariantViolation(format!(
                "block {} paired with results of {}",
                block.height, results.height
            )));
        }
        if block.tx_hashes.len() != results.txs_results.len() {
            return Err(SyncError::InvariantViolation(format!(
                "block {} has {} txs but {} results",
                block.height,
                block.tx_hashes.len(),
                results.txs_results.len()
            )));
        }
        let txs = block
            .tx_hashes
            .into_iter()
            .zip(results.txs_results)
            .filter(|(_, result)| result.code == 0)
            .map(|(hash, result)| BlockTx {
                hash,
                events: result.events,
            })
            .collect();
        Ok(Self {
            height: block.height,
            hash: block.hash,
            time: block.time,
            txs,
            block_events: results.block_events,
        })
    }

    pub fn event_count(&self) -> usize {
        self.txs.iter().map(|tx| tx.events.len()).sum::<usize>()
            + self.block_events.len()
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Height of the latest block the node has committed.
    async fn latest_height(&self) -> Result<u64, SyncError>;

    async fn block(&self, height: u64) -> Result<Block, SyncError>;

    async fn block_results(
        &self,
        height: u64,
    ) -> Result<BlockResults, SyncError>;

    /// Header and results of `height`.
    async fn fetch(&self, height: u64) -> Result<BlockData, SyncError> {
        let block = self.block(height).await?;
        let results = self.block_results(height).await?;
        BlockData::assemble(block, results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(txs: usize) -> Block {
        Block {
            height: 7,
            hash: "0xaa".into(),
            time: 1,
            tx_hashes: (0..txs).map(|i| format!("0x{i:02x}")).collect(),
        }
    }

    #[test]
    fn test_assemble_drops_failed_txs() {
        let results = BlockResults {
            height: 7,
            txs_results: vec![
                TxResult {
                    code: 0,
                    events: vec![AbciEvent::new("a")],
                },
                TxResult {
                    code: 5,
                    events: vec![AbciEvent::new("b")],
                },
            ],
            block_events: vec![AbciEvent::new("c")],
        };
        let data = BlockData::assemble(block(2), results).unwrap();
        assert_eq!(data.txs.len(), 1);
        assert_eq!(data.txs[0].hash, "0x00");
        assert_eq!(data.event_count(), 2);
    }

    #[test]
    fn test_assemble_rejects_mismatched_results() {
        let results = BlockResults {
            height: 7,
            txs_results: vec![],
            block_events: vec![],
        };
        let err = BlockData::assemble(block(1), results).unwrap_err();
        assert_eq!(err.kind(), "invariant_violation");

        let results = BlockResults {
            height: 8,
            ..Default::default()
        };
        assert!(BlockData::assemble(block(0), results).is_err());
    }
}
