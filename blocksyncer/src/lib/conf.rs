// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::fmt::Formatter;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use humantime_serde::re::humantime::parse_duration;
use serde::{Deserialize, Serialize};

pub const RPC_URL_ENV: &str = "BS_CHAIN_RPC_URL";
pub const POLL_INTERVAL_ENV: &str = "BS_POLL_INTERVAL";
pub const START_HEIGHT_ENV: &str = "BS_START_HEIGHT";

/// Chain node access.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
    /// CometBFT JSON-RPC endpoint.
    pub rpc_url: String,

    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// First delay after a failed RPC call. Doubles on every failure of the
    /// same call, up to `max_backoff`.
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:26657".into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl ChainConfig {
    pub fn overlay_env<F>(&mut self, get_env: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get_env(RPC_URL_ENV) {
            self.rpc_url = url;
        }
    }

    /// Delay before the `failures + 1`-th attempt of an RPC call.
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 1u32
            .checked_shl(failures.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rpc_url.starts_with("http://")
            && !self.rpc_url.starts_with("https://")
        {
            bail!("rpc_url must be an http(s) url, got '{}'", self.rpc_url);
        }
        Ok(())
    }
}

impl std::fmt::Display for ChainConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rpc_url: {}, connect_timeout: {:?}, request_timeout: {:?}, \
             backoff: {:?}..{:?}",
            self.rpc_url,
            self.connect_timeout,
            self.request_timeout,
            self.initial_backoff,
            self.max_backoff,
        )
    }
}

/// Block driver and supervisor tuning.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SyncerParams {
    /// Pause between two polls of the latest height once the tip is reached.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// First height to process when the database holds no epoch yet.
    pub start_height: u64,

    /// The standby takes over once it is less than this many blocks behind
    /// the main database.
    pub switch_height_diff: u64,

    /// How often the supervisor compares the two epochs.
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,
}

impl Default for SyncerParams {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            start_height: 1,
            switch_height_diff: 100,
            check_interval: Duration::from_secs(60),
        }
    }
}

impl SyncerParams {
    pub fn overlay_env<F>(&mut self, get_env: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(interval) = get_env(POLL_INTERVAL_ENV) {
            self.poll_interval = parse_duration(&interval)
                .with_context(|| format!("invalid {POLL_INTERVAL_ENV}"))?;
        }
        if let Some(height) = get_env(START_HEIGHT_ENV) {
            self.start_height = height
                .parse()
                .with_context(|| format!("invalid {START_HEIGHT_ENV}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_height == 0 {
            bail!("start_height starts at 1");
        }
        if self.check_interval.is_zero() {
            bail!("check_interval must be positive");
        }
        Ok(())
    }
}

impl std::fmt::Display for SyncerParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "poll_interval: {:?}, start_height: {}, switch_height_diff: {}, \
             check_interval: {:?}",
            self.poll_interval,
            self.start_height,
            self.switch_height_diff,
            self.check_interval,
        )
    }
}
