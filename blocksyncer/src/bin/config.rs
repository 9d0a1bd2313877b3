// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use blocksyncer::conf::{ChainConfig, SyncerParams};
use bsdb::conf::Params;
use serde::{Deserialize, Serialize};

use crate::args::Args;

pub const BLOCK_RETRY_BOUND_ENV: &str = "BS_BLOCK_RETRY_BOUND";

/// Default log_level.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log_type.
const DEFAULT_LOG_TYPE: &str = "coloured";

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
#[serde(default)]
pub(crate) struct Config {
    log_level: Option<String>,
    log_type: Option<String>,
    log_filter: Option<String>,

    pub(crate) chain: ChainConfig,

    /// Main and standby databases. `retry` bounds the attempts of a block
    /// that keeps hitting transient database errors.
    pub(crate) db: Params,

    pub(crate) syncer: SyncerParams,
}

impl Config {
    /// Read the optional TOML file, overlay the environment read through
    /// `get_env`, then the command line.
    pub(crate) fn load<F>(args: &Args, get_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.overlay_env(&get_env)?;
        config.merge(args);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let toml = std::fs::read_to_string(path).with_context(|| {
            format!("cannot read config file {}", path.display())
        })?;
        toml::from_str(&toml).with_context(|| {
            format!("invalid config file {}", path.display())
        })
    }

    fn overlay_env<F>(&mut self, get_env: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.db.overlay_env(get_env);
        self.chain.overlay_env(get_env);
        self.syncer.overlay_env(get_env)?;
        if let Some(bound) = get_env(BLOCK_RETRY_BOUND_ENV) {
            self.db.retry.max_attempts = bound
                .parse()
                .with_context(|| format!("invalid {BLOCK_RETRY_BOUND_ENV}"))?;
        }
        Ok(())
    }

    fn merge(&mut self, args: &Args) {
        // Overwrite config log-level
        if let Some(log_level) = args.log_level {
            self.log_level = Some(log_level.to_string());
        }

        // Overwrite config log-type
        if let Some(log_type) = &args.log_type {
            self.log_type = Some(log_type.into());
        }

        // Overwrite config log-filter
        if let Some(log_filter) = &args.log_filter {
            self.log_filter = Some(log_filter.into());
        }

        if let Some(rpc_url) = &args.rpc_url {
            self.chain.rpc_url = rpc_url.into();
        }
        if let Some(start_height) = args.start_height {
            self.syncer.start_height = start_height;
        }
    }

    fn validate(&self) -> Result<()> {
        self.log_level()?;
        self.chain.validate().context("invalid chain config")?;
        self.db.validate().context("invalid db config")?;
        self.syncer.validate().context("invalid syncer config")
    }

    pub(crate) fn log_type(&self) -> String {
        match &self.log_type {
            None => DEFAULT_LOG_TYPE.into(),
            Some(log_type) => log_type.into(),
        }
    }

    pub(crate) fn log_level(&self) -> Result<tracing::Level> {
        let log_level = match &self.log_level {
            None => DEFAULT_LOG_LEVEL,
            Some(log_level) => log_level,
        };
        tracing::Level::from_str(log_level).with_context(|| {
            format!("Invalid log-level specified '{log_level}'")
        })
    }

    pub(crate) fn log_filter(&self) -> String {
        self.log_filter.clone().unwrap_or_default()
    }
}
