// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! CometBFT JSON-RPC over HTTP.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use serde_with::{serde_as, DisplayFromStr};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{
    AbciEvent, Block, BlockResults, ChainClient, EventAttribute, TxResult,
};
use crate::conf::ChainConfig;
use crate::error::SyncError;

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Deserialize)]
struct StatusResult {
    sync_info: SyncInfo,
}

#[serde_as]
#[derive(Deserialize)]
struct SyncInfo {
    #[serde_as(as = "DisplayFromStr")]
    latest_block_height: u64,
}

#[derive(Deserialize)]
struct BlockResult {
    block_id: BlockId,
    block: BlockBody,
}

#[derive(Deserialize)]
struct BlockId {
    hash: String,
}

#[derive(Deserialize)]
struct BlockBody {
    header: Header,
    data: TxsData,
}

#[serde_as]
#[derive(Deserialize)]
struct Header {
    #[serde_as(as = "DisplayFromStr")]
    height: u64,
    time: String,
}

#[derive(Deserialize)]
struct TxsData {
    txs: Option<Vec<String>>,
}

#[serde_as]
#[derive(Deserialize)]
struct BlockResultsResult {
    #[serde_as(as = "DisplayFromStr")]
    height: u64,
    txs_results: Option<Vec<RawTxResult>>,
    begin_block_events: Option<Vec<RawEvent>>,
    end_block_events: Option<Vec<RawEvent>>,
    finalize_block_events: Option<Vec<RawEvent>>,
}

#[derive(Deserialize)]
struct RawTxResult {
    #[serde(default)]
    code: u32,
    events: Option<Vec<RawEvent>>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    attributes: Option<Vec<RawAttribute>>,
}

#[derive(Deserialize)]
struct RawAttribute {
    key: String,
    value: Option<String>,
}

impl From<RawEvent> for AbciEvent {
    fn from(raw: RawEvent) -> Self {
        AbciEvent {
            kind: raw.kind,
            attributes: raw
                .attributes
                .unwrap_or_default()
                .into_iter()
                .map(|a| EventAttribute {
                    key: a.key,
                    value: a.value.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

fn events(raw: Option<Vec<RawEvent>>) -> Vec<AbciEvent> {
    raw.unwrap_or_default().into_iter().map(Into::into).collect()
}

/// Hash of a transaction as the chain reports it: SHA-256 of its bytes.
pub fn tx_hash(tx: &[u8]) -> String {
    format!("0x{}", hex::encode(Sha256::digest(tx)))
}

/// Unix seconds of an RFC 3339 block time.
pub fn parse_block_time(time: &str) -> Result<i64, SyncError> {
    chrono::DateTime::parse_from_rfc3339(time)
        .map(|t| t.timestamp())
        .map_err(|e| {
            SyncError::TransientRpc(format!("bad block time {time}: {e}"))
        })
}

/// JSON-RPC client of a CometBFT node.
#[derive(Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    uri: String,
}

impl RpcClient {
    /// Create a new client of the node at `conf.rpc_url`.
    ///
    /// # Errors
    /// This method errors if a TLS backend cannot be initialized, or the
    /// resolver cannot load the system configuration.
    pub fn new(conf: &ChainConfig) -> Result<Self, SyncError> {
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(conf.connect_timeout)
            .timeout(conf.request_timeout)
            .build()?;
        Ok(Self {
            client,
            uri: conf.rpc_url.clone(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, SyncError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self.client.post(&self.uri).json(&request).send().await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(SyncError::TransientRpc(format!("{method}: {status}")));
        }
        let body: RpcResponse<T> = response.json().await?;
        match (body.result, body.error) {
            (_, Some(err)) => Err(SyncError::TransientRpc(format!(
                "{method}: {} ({}) {}",
                err.message,
                err.code,
                err.data.unwrap_or_default()
            ))),
            (Some(result), None) => Ok(result),
            (None, None) => Err(SyncError::TransientRpc(format!(
                "{method}: empty response"
            ))),
        }
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn latest_height(&self) -> Result<u64, SyncError> {
        let status: StatusResult = self.call("status", json!({})).await?;
        Ok(status.sync_info.latest_block_height)
    }

    async fn block(&self, height: u64) -> Result<Block, SyncError> {
        let result: BlockResult = self
            .call("block", json!({ "height": height.to_string() }))
            .await?;
        let tx_hashes = result
            .block
            .data
            .txs
            .unwrap_or_default()
            .iter()
            .map(|tx| {
                STANDARD.decode(tx).map(|bytes| tx_hash(&bytes)).map_err(|e| {
                    SyncError::TransientRpc(format!(
                        "block {height} carries a tx that is not base64: {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(height, txs = tx_hashes.len(), "fetched block");
        Ok(Block {
            height: result.block.header.height,
            hash: format!("0x{}", result.block_id.hash.to_lowercase()),
            time: parse_block_time(&result.block.header.time)?,
            tx_hashes,
        })
    }

    async fn block_results(
        &self,
        height: u64,
    ) -> Result<BlockResults, SyncError> {
        let result: BlockResultsResult = self
            .call("block_results", json!({ "height": height.to_string() }))
            .await?;
        let txs_results = result
            .txs_results
            .unwrap_or_default()
            .into_iter()
            .map(|tx| TxResult {
                code: tx.code,
                events: events(tx.events),
            })
            .collect();
        let mut block_events = events(result.begin_block_events);
        block_events.extend(events(result.end_block_events));
        block_events.extend(events(result.finalize_block_events));
        Ok(BlockResults {
            height: result.height,
            txs_results,
            block_events,
        })
    }
}
