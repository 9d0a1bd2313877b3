// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use bsdb::retry::Retryable;
use bsdb::DbError;
use thiserror::Error;

/// Errors raised while syncing a block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The chain node could not be reached or answered with an error.
    #[error("Chain RPC failed: {0}")]
    TransientRpc(String),
    /// A deadlock or lock wait timeout, the block can be retried as a whole.
    #[error("Transient db failure: {0}")]
    TransientDb(DbError),
    /// An event some module is interested in could not be parsed.
    #[error("Failed to parse event {event}: {reason}")]
    ParseEvent { event: String, reason: String },
    /// Stored state contradicts what the chain says.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Handler failed: {0}")]
    HandlerInternal(String),
    #[error(transparent)]
    Db(DbError),
}

impl SyncError {
    pub fn parse(event: &str, reason: impl ToString) -> Self {
        SyncError::ParseEvent {
            event: event.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// Whether processing the same block again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::TransientRpc(_) | SyncError::TransientDb(_))
    }

    /// Short name of the error kind, used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::TransientRpc(_) => "transient_rpc",
            SyncError::TransientDb(_) => "transient_db",
            SyncError::ParseEvent { .. } => "parse_event",
            SyncError::InvariantViolation(_) => "invariant_violation",
            SyncError::HandlerInternal(_) => "handler_internal",
            SyncError::Db(e) => e.kind(),
        }
    }
}

impl Retryable for SyncError {
    fn is_retryable(&self) -> bool {
        SyncError::is_retryable(self)
    }
}

impl From<DbError> for SyncError {
    fn from(err: DbError) -> Self {
        if err.is_retryable() {
            SyncError::TransientDb(err)
        } else {
            SyncError::Db(err)
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::TransientRpc(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadlocks_become_transient() {
        let err: SyncError = DbError::DeadlockRetry("1213".into()).into();
        assert_eq!(err.kind(), "transient_db");
        assert!(err.is_retryable());

        let err: SyncError = DbError::Io("broken pipe".into()).into();
        assert_eq!(err.kind(), "io_error");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(!SyncError::parse("EventCreateBucket", "bad id").is_retryable());
        assert!(!SyncError::HandlerInternal("x".into()).is_retryable());
        assert!(SyncError::TransientRpc("timeout".into()).is_retryable());
    }
}
