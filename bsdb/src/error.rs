// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Errors surfaced by the persistence engine.

use thiserror::Error;

/// MySQL error number for a detected deadlock.
const ER_LOCK_DEADLOCK: u16 = 1213;
/// MySQL error number for an exceeded `innodb_lock_wait_timeout`.
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;

/// Errors related to database operations.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum DbError {
    /// The requested row does not exist.
    #[error("Data not found in database: {0}")]
    NotFound(String),
    /// A unique key was violated by a write that does not upsert.
    #[error("Unique key conflict: {0}")]
    Conflict(String),
    /// The transaction lost a lock race and must be retried as a whole.
    #[error("Deadlock or lock wait timeout, transaction must be retried: {0}")]
    DeadlockRetry(String),
    /// Connection, pool or statement failure.
    #[error("Database i/o failed: {0}")]
    Io(String),
    /// A column could not be decoded into the requested type.
    #[error("Failed to decode column: {0}")]
    Decode(String),
    /// The statement references a table or column the catalog does not
    /// know.
    #[error("Schema mismatch: {0}")]
    Schema(String),
    /// A read request the engine cannot serve.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl DbError {
    /// Whether retrying the whole transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::DeadlockRetry(_))
    }

    /// Short name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DbError::NotFound(_) => "not_found",
            DbError::Conflict(_) => "conflict",
            DbError::DeadlockRetry(_) => "deadlock_retry",
            DbError::Io(_) => "io_error",
            DbError::Decode(_) => "decode_error",
            DbError::Schema(_) => "schema_error",
            DbError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound(err.to_string()),
            sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_) => DbError::Decode(err.to_string()),
            sqlx::Error::Database(ref db_err) => {
                let number = db_err
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .map(|e| e.number());
                match number {
                    Some(ER_LOCK_DEADLOCK) | Some(ER_LOCK_WAIT_TIMEOUT) => {
                        DbError::DeadlockRetry(err.to_string())
                    }
                    _ if db_err.is_unique_violation() => {
                        DbError::Conflict(err.to_string())
                    }
                    _ => DbError::Io(err.to_string()),
                }
            }
            _ => DbError::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_deadlocks_are_retryable() {
        assert!(DbError::DeadlockRetry("1213".into()).is_retryable());
        assert!(!DbError::Io("reset".into()).is_retryable());
        assert!(!DbError::Conflict("dup".into()).is_retryable());
        assert!(!DbError::NotFound("epoch".into()).is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_pool_timeout_maps_to_io() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), "io_error");
    }
}
