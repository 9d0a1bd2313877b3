// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::fmt::Formatter;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Prefix of the main database environment variables.
pub const MAIN_ENV_PREFIX: &str = "BS_DB_";
/// Prefix of the standby database environment variables.
pub const SWITCHED_ENV_PREFIX: &str = "BS_DB_SWITCHED_";

static IDENTIFIER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Whether `name` may be used unquoted as a MySQL identifier.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.as_ref().is_some_and(|re| re.is_match(name))
}

/// Connection coordinates of one database.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DbCredentials {
    pub user: String,
    pub password: String,
    /// `host[:port]`, port defaults to 3306.
    pub address: String,
    pub database: String,
}

impl Default for DbCredentials {
    fn default() -> Self {
        Self {
            user: "root".into(),
            password: String::new(),
            address: "127.0.0.1:3306".into(),
            database: "block_syncer".into(),
        }
    }
}

impl DbCredentials {
    /// Overlay the `{prefix}USER`, `{prefix}PASSWORD`, `{prefix}ADDRESS` and
    /// `{prefix}DATABASE` variables. Returns whether any was set.
    pub fn overlay<F>(&mut self, prefix: &str, get_env: &F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut found = false;
        for (name, field) in [
            ("USER", &mut self.user),
            ("PASSWORD", &mut self.password),
            ("ADDRESS", &mut self.address),
            ("DATABASE", &mut self.database),
        ] {
            if let Some(value) = get_env(&format!("{prefix}{name}")) {
                *field = value;
                found = true;
            }
        }
        found
    }

    /// Split the address into host and port.
    pub fn host_port(&self) -> Result<(String, u16)> {
        match self.address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|e| {
                    anyhow!("invalid port in db address {}: {e}", self.address)
                })?;
                Ok((host.to_owned(), port))
            }
            None => Ok((self.address.clone(), 3306)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.database) {
            bail!("invalid database name '{}'", self.database);
        }
        if self.address.is_empty() {
            bail!("db address must not be empty");
        }
        self.host_port()?;
        Ok(())
    }
}

impl std::fmt::Display for DbCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // The password is never logged
        write!(f, "{}@{}/{}", self.user, self.address, self.database)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Params {
    /// The main database.
    #[serde(flatten)]
    pub main: DbCredentials,

    /// The standby database, written by a second syncer while a migration
    /// catches up.
    pub switched: Option<DbCredentials>,

    /// Max number of connections of the writer pool.
    pub writer_max_connections: u32,

    /// Max number of connections of the reader pool.
    pub reader_max_connections: u32,

    /// Client side timeout of a single statement, also pushed to the session
    /// lock wait and execution limits.
    #[serde(with = "humantime_serde")]
    pub statement_timeout: Duration,

    /// Transaction level retry on deadlocks and lock wait timeouts.
    pub retry: RetryPolicy,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            main: DbCredentials::default(),
            switched: None,
            writer_max_connections: 1,
            reader_max_connections: 16,
            statement_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl Params {
    /// Overlay `BS_DB_*` and `BS_DB_SWITCHED_*` variables read through
    /// `get_env`.
    pub fn overlay_env<F>(&mut self, get_env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.main.overlay(MAIN_ENV_PREFIX, &get_env);
        let mut switched = self.switched.clone().unwrap_or_default();
        if switched.overlay(SWITCHED_ENV_PREFIX, &get_env) {
            self.switched = Some(switched);
        }
    }

    /// Overlay the process environment.
    pub fn from_env(mut self) -> Self {
        self.overlay_env(|name| std::env::var(name).ok());
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.main.validate()?;
        if let Some(switched) = &self.switched {
            switched.validate()?;
        }
        if self.writer_max_connections == 0 || self.reader_max_connections == 0
        {
            bail!("db pools need at least one connection");
        }
        if self.statement_timeout.is_zero() {
            bail!("statement_timeout must be positive");
        }
        Ok(())
    }
}

impl std::fmt::Display for Params {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "main: {}, \
             switched: {}, \
             writer_max_connections: {}, \
             reader_max_connections: {}, \
             statement_timeout: {:?}, \
             retry: {}",
            self.main,
            self.switched
                .as_ref()
                .map_or_else(|| "none".to_owned(), ToString::to_string),
            self.writer_max_connections,
            self.reader_max_connections,
            self.statement_timeout,
            self.retry,
        )
    }
}
