// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Block syncer: reads Greenfield blocks in height order and projects their
//! storage events into the relational schema of `bsdb`, one database
//! transaction per block.

pub mod backfill;
pub mod chain;
pub mod conf;
pub mod context;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod events;
pub mod modules;
pub mod registry;
pub mod supervisor;

pub use error::SyncError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
