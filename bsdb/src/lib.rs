// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Relational storage of the block syncer.
//!
//! The crate owns everything that touches MySQL: the object shard function,
//! the table catalog, the transactional persistence engine (with an
//! in-memory twin used by tests), the master/standby signal and the read
//! side queried by the metadata service.

pub mod catalog;
pub mod conf;
pub mod epoch;
mod error;
pub mod master;
pub mod metadata;
pub mod models;
pub mod query;
pub mod retry;
pub mod schema_manager;
pub mod shard;
pub mod store;
pub mod value;

pub use error::DbError;
pub use query::{Filter, Order, RowMutation, Select};
pub use store::memory::MemoryStore;
pub use store::mysql::MySqlStore;
pub use store::{Lookup, Store, StoreTx};
pub use value::{Row, Value};
