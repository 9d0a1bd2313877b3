// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! The block driver: pulls heights from the chain in order and hands each
//! one to the dispatcher.
//!
//! ```text
//! INIT -> CATCHING_UP <-> FOLLOWING -> STOPPED
//! ```
//!
//! Unreachable nodes are retried forever with a capped exponential backoff,
//! a block that keeps deadlocking is retried as a whole a bounded number of
//! times, and any other error stops the driver. Cancellation is honoured
//! between blocks only.

use std::sync::Arc;
use std::time::Duration;

use bsdb::retry::RetryPolicy;
use bsdb::{epoch, Store};
use metrics::{counter, gauge};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::chain::{BlockData, ChainClient};
use crate::conf::{ChainConfig, SyncerParams};
use crate::dispatcher::Dispatcher;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Init,
    CatchingUp,
    Following,
    Stopped,
}

pub struct BlockDriver {
    name: &'static str,
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn Store>,
    dispatcher: Arc<Dispatcher>,
    chain_conf: ChainConfig,
    params: SyncerParams,
    block_retry: RetryPolicy,
    state: DriverState,
    next: u64,
}

impl BlockDriver {
    pub fn new(
        name: &'static str,
        chain: Arc<dyn ChainClient>,
        store: Arc<dyn Store>,
        dispatcher: Arc<Dispatcher>,
        chain_conf: ChainConfig,
        params: SyncerParams,
        block_retry: RetryPolicy,
    ) -> Self {
        Self {
            name,
            chain,
            store,
            dispatcher,
            chain_conf,
            params,
            block_retry,
            state: DriverState::Init,
            next: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Height the driver processes next, meaningful once initialized.
    pub fn next_height(&self) -> u64 {
        self.next
    }

    /// Resume after the last committed epoch, or at the configured start
    /// height on an empty database.
    pub async fn init(&mut self) -> Result<u64, SyncError> {
        self.next = match epoch::latest(self.store.as_ref()).await? {
            Some(epoch) => {
                let height = u64::try_from(epoch.block_height).map_err(|_| {
                    SyncError::InvariantViolation(format!(
                        "stored epoch height {} is negative",
                        epoch.block_height
                    ))
                })?;
                height + 1
            }
            None => self.params.start_height,
        };
        info!(
            event = "driver initialized",
            driver = self.name,
            next_height = self.next
        );
        Ok(self.next)
    }

    /// Run until cancelled or until an error that retrying cannot fix.
    pub async fn run(
        &mut self,
        cancel: CancellationToken,
    ) -> Result<(), SyncError> {
        let result = self.drive(&cancel).await;
        self.state = DriverState::Stopped;
        match &result {
            Ok(()) => info!(
                event = "driver stopped",
                driver = self.name,
                next_height = self.next
            ),
            Err(e) => error!(
                event = "driver failed",
                driver = self.name,
                height = self.next,
                kind = e.kind(),
                err = %e
            ),
        }
        result
    }

    async fn drive(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        if self.state == DriverState::Init {
            self.init().await?;
        }
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let Some(processed) = self.catch_up(cancel).await? else {
                return Ok(());
            };
            if processed == 0 {
                if self.state != DriverState::Following {
                    debug!(
                        event = "following",
                        driver = self.name,
                        next_height = self.next
                    );
                }
                self.state = DriverState::Following;
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.params.poll_interval) => {}
                }
            }
        }
    }

    /// Process every block up to the current tip of the chain. Returns the
    /// number of processed blocks, `None` when cancelled.
    pub async fn catch_up(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<u64>, SyncError> {
        let Some(latest) = self
            .with_rpc_retry(cancel, "status", || self.chain.latest_height())
            .await?
        else {
            return Ok(None);
        };
        gauge!("blocksyncer_chain_height").set(latest as f64);

        let mut processed = 0;
        while self.next <= latest {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            self.state = DriverState::CatchingUp;
            let height = self.next;
            let Some(block) = self
                .with_rpc_retry(cancel, "block", || self.chain.fetch(height))
                .await?
            else {
                return Ok(None);
            };
            self.process(&block).await?;
            self.next += 1;
            processed += 1;
        }
        Ok(Some(processed))
    }

    async fn process(&self, block: &BlockData) -> Result<(), SyncError> {
        let stats = self
            .dispatcher
            .process_block_with_retry(
                self.store.as_ref(),
                block,
                &self.block_retry,
            )
            .await?;
        counter!("blocksyncer_blocks").increment(1);
        counter!("blocksyncer_events_handled").increment(stats.events_handled);
        counter!("blocksyncer_mutations").increment(stats.mutations);
        gauge!("blocksyncer_synced_height").set(block.height as f64);
        info!(
            event = "block synced",
            driver = self.name,
            height = block.height,
            txs = block.txs.len(),
            events = stats.events_seen,
            handled = stats.events_handled,
            mutations = stats.mutations,
        );
        Ok(())
    }

    /// Call `op` until it succeeds, retrying transient failures forever.
    /// `None` when cancelled while waiting.
    async fn with_rpc_retry<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        what: &str,
        mut op: F,
    ) -> Result<Option<T>, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, SyncError>>,
    {
        let mut failures = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(Some(v)),
                Err(e) if e.is_retryable() => {
                    failures = failures.saturating_add(1);
                    let delay: Duration = self.chain_conf.backoff(failures);
                    counter!("blocksyncer_rpc_failures").increment(1);
                    warn!(
                        event = "rpc failed",
                        driver = self.name,
                        call = what,
                        height = self.next,
                        failures,
                        retry_in = ?delay,
                        err = %e
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
