// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::collections::HashMap;

use bsdb::Row;

/// Counters of one processed block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStats {
    /// Events of the block, including those no module wants.
    pub events_seen: u64,
    /// Events parsed and handed to at least one module.
    pub events_handled: u64,
    /// Mutations applied to the block transaction.
    pub mutations: u64,
}

/// What a handler knows about the block and the event being processed.
#[derive(Debug, Clone, Default)]
pub struct BlockContext {
    pub height: u64,
    pub block_hash: String,
    /// Block time, unix seconds.
    pub block_time: i64,
    /// Hash of the transaction that emitted the current event. Events
    /// emitted outside of a transaction are attributed to the block hash.
    pub tx_hash: String,
    /// Position of the current event in its transaction.
    pub event_index: u32,
    /// Prefix-tree folders known to exist (`true`) or to be absent
    /// (`false`), by `(bucket_name, full_name)`.
    pub folders: HashMap<(String, String), bool>,
    pub stats: BlockStats,
}

impl BlockContext {
    pub fn new(height: u64, block_hash: &str, block_time: i64) -> Self {
        Self {
            height,
            block_hash: block_hash.to_owned(),
            block_time,
            ..Default::default()
        }
    }

    /// Point the context at the `event_index`-th event of `tx_hash`.
    pub fn at_event(&mut self, tx_hash: &str, event_index: u32) {
        if self.tx_hash != tx_hash {
            self.tx_hash = tx_hash.to_owned();
        }
        self.event_index = event_index;
    }

    /// `update_*` columns of a touched row.
    pub fn update_fields(&self) -> Row {
        Row::new()
            .with("update_at", self.height)
            .with("update_tx_hash", &self.tx_hash)
            .with("update_time", self.block_time)
    }

    /// `create_*` and `update_*` columns of a row created by this event.
    pub fn create_fields(&self) -> Row {
        let mut row = Row::new()
            .with("create_at", self.height)
            .with("create_tx_hash", &self.tx_hash)
            .with("create_time", self.block_time);
        row.merge(&self.update_fields());
        row
    }

    /// Columns shared by audit rows.
    pub fn audit_fields(&self) -> Row {
        Row::new()
            .with("create_at", self.height)
            .with("create_tx_hash", &self.tx_hash)
            .with("create_time", self.block_time)
            .with("event_index", self.event_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_fields() {
        let mut ctx = BlockContext::new(12, "0xblock", 1_700_000_000);
        ctx.at_event("0xtx", 3);
        let row = ctx.create_fields();
        assert_eq!(row.int("create_at").unwrap(), 12);
        assert_eq!(row.text("create_tx_hash").unwrap(), "0xtx");
        assert_eq!(row.int("update_time").unwrap(), 1_700_000_000);
        assert_eq!(ctx.audit_fields().int("event_index").unwrap(), 3);
        assert!(!ctx.update_fields().contains("create_at"));
    }
}
