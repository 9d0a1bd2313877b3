// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Hand-over between the main database and a standby one being rebuilt
//! from scratch.
//!
//! The checker compares both epochs every `check_interval`. Once the
//! standby is less than `switch_height_diff` blocks behind, the `master_db`
//! signal is flipped and the main driver is asked to stop. Readers follow
//! the signal to pick the database they query.

use std::sync::Arc;

use bsdb::{epoch, master, DbError, Store};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::conf::SyncerParams;

/// Outcome of a single comparison of the two epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// One of the databases has no epoch yet.
    NotStarted,
    /// The standby is still this many blocks behind.
    Behind(u64),
    /// The signal was flipped to the given value.
    Switched(bool),
}

pub struct ProgressChecker {
    main: Arc<dyn Store>,
    standby: Arc<dyn Store>,
    params: SyncerParams,
}

impl ProgressChecker {
    pub fn new(
        main: Arc<dyn Store>,
        standby: Arc<dyn Store>,
        params: SyncerParams,
    ) -> Self {
        Self {
            main,
            standby,
            params,
        }
    }

    pub async fn check_once(&self) -> Result<Progress, DbError> {
        let main = epoch::latest(self.main.as_ref()).await?;
        let standby = epoch::latest(self.standby.as_ref()).await?;
        let (Some(main), Some(standby)) = (main, standby) else {
            return Ok(Progress::NotStarted);
        };
        let behind =
            main.block_height.saturating_sub(standby.block_height).max(0)
                as u64;
        if behind >= self.params.switch_height_diff {
            return Ok(Progress::Behind(behind));
        }

        let current = master::ensure_signal(self.main.as_ref()).await?;
        master::set_signal(self.main.as_ref(), !current).await?;
        info!(
            event = "master switched",
            main_height = main.block_height,
            standby_height = standby.block_height,
            is_master = !current
        );
        Ok(Progress::Switched(!current))
    }

    /// Compare the epochs until the switch happens, then cancel
    /// `main_driver`. Comparison errors are logged and retried on the next
    /// tick.
    pub async fn run(
        &self,
        main_driver: CancellationToken,
        cancel: CancellationToken,
    ) {
        loop {
            match self.check_once().await {
                Ok(Progress::Switched(_)) => {
                    main_driver.cancel();
                    return;
                }
                Ok(Progress::Behind(blocks)) => {
                    info!(event = "standby behind", blocks)
                }
                Ok(Progress::NotStarted) => {}
                Err(e) => warn!(event = "progress check failed", err = %e),
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.params.check_interval) => {}
            }
        }
    }
}
