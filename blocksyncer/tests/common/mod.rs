// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use blocksyncer::chain::{AbciEvent, BlockData, BlockTx};
use blocksyncer::dispatcher::Dispatcher;
use blocksyncer::modules::default_registry;
use bsdb::metadata::MetadataReader;
use bsdb::{MemoryStore, Row};

pub const OWNER: &str = "0x00000000000000000000000000000000000000aa";

pub fn hex_id(n: u64) -> String {
    format!("0x{n:064x}")
}

pub fn account(n: u8) -> String {
    format!("0x{}", hex::encode([n; 20]))
}

pub fn quoted(v: impl std::fmt::Display) -> String {
    format!("\"{v}\"")
}

pub fn storage(kind: &str) -> AbciEvent {
    AbciEvent::new(&format!("greenfield.storage.{kind}"))
}

pub fn create_bucket(id: u64, name: &str) -> AbciEvent {
    storage("EventCreateBucket")
        .attr("bucket_id", quoted(id))
        .attr("bucket_name", quoted(name))
        .attr("owner", quoted(OWNER))
        .attr("visibility", quoted("VISIBILITY_TYPE_PRIVATE"))
        .attr("create_at", quoted(1_690_000_000))
}

pub fn create_object(
    id: u64,
    bucket_id: u64,
    bucket: &str,
    name: &str,
) -> AbciEvent {
    storage("EventCreateObject")
        .attr("object_id", quoted(id))
        .attr("bucket_id", quoted(bucket_id))
        .attr("bucket_name", quoted(bucket))
        .attr("object_name", quoted(name))
        .attr("owner", quoted(OWNER))
        .attr("creator", quoted(OWNER))
        .attr("payload_size", quoted(1024))
        .attr("visibility", quoted("VISIBILITY_TYPE_INHERIT"))
        .attr("status", quoted("OBJECT_STATUS_CREATED"))
}

fn object_event(kind: &str, id: u64, bucket: &str, name: &str) -> AbciEvent {
    storage(kind)
        .attr("object_id", quoted(id))
        .attr("bucket_name", quoted(bucket))
        .attr("object_name", quoted(name))
        .attr("operator", quoted(OWNER))
}

/// Seal with checksums `[0x0102, 0x0304]`.
pub fn seal_object(id: u64, bucket: &str, name: &str) -> AbciEvent {
    object_event("EventSealObject", id, bucket, name)
        .attr("status", quoted("OBJECT_STATUS_SEALED"))
        .attr("local_virtual_group_id", "3")
        .attr("checksums", r#"["AQI=","AwQ="]"#)
}

pub fn delete_object(id: u64, bucket: &str, name: &str) -> AbciEvent {
    object_event("EventDeleteObject", id, bucket, name)
}

pub fn group_event(kind: &str, group_id: u64) -> AbciEvent {
    storage(kind)
        .attr("group_id", quoted(group_id))
        .attr("group_name", quoted("g"))
        .attr("owner", quoted(OWNER))
        .attr("operator", quoted(OWNER))
}

pub fn add_members(group_id: u64, members: &[String]) -> AbciEvent {
    let members: Vec<_> = members
        .iter()
        .map(|m| {
            serde_json::json!({
                "member": m,
                "expiration_time": "2030-01-01T00:00:00Z",
            })
        })
        .collect();
    group_event("EventUpdateGroupMember", group_id)
        .attr("members_to_add", serde_json::Value::Array(members).to_string())
}

pub fn remove_members(group_id: u64, members: &[String]) -> AbciEvent {
    group_event("EventUpdateGroupMember", group_id).attr(
        "members_to_delete",
        serde_json::Value::from(members.to_vec()).to_string(),
    )
}

pub fn put_policy(policy_id: u64, statements: serde_json::Value) -> AbciEvent {
    AbciEvent::new("greenfield.permission.EventPutPolicy")
        .attr(
            "principal",
            serde_json::json!({
                "type": "PRINCIPAL_TYPE_GNFD_ACCOUNT",
                "value": account(0xbb),
            })
            .to_string(),
        )
        .attr("resource_type", quoted("RESOURCE_TYPE_BUCKET"))
        .attr("resource_id", quoted(1))
        .attr("policy_id", quoted(policy_id))
        .attr("statements", statements.to_string())
}

pub fn delete_policy(policy_id: u64) -> AbciEvent {
    AbciEvent::new("greenfield.permission.EventDeletePolicy")
        .attr("policy_id", quoted(policy_id))
}

/// A block with a single transaction carrying `events`.
pub fn block(height: u64, events: Vec<AbciEvent>) -> BlockData {
    BlockData {
        height,
        hash: hex_id(height),
        time: 1_700_000_000 + height as i64,
        txs: vec![BlockTx {
            hash: hex_id(10_000 + height),
            events,
        }],
        block_events: vec![],
    }
}

/// An in-memory database with every table and a dispatcher over the
/// default modules.
pub struct Harness {
    pub store: MemoryStore,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let registry = Arc::new(default_registry());
        registry.prepare_tables(&store).await.unwrap();
        Self {
            store,
            dispatcher: Dispatcher::new(registry),
        }
    }

    pub async fn process(&self, block: &BlockData) {
        self.dispatcher
            .process_block(&self.store, block)
            .await
            .unwrap();
    }

    /// Process one block per event list, starting at `first_height`.
    pub async fn run(&self, first_height: u64, blocks: Vec<Vec<AbciEvent>>) {
        for (i, events) in blocks.into_iter().enumerate() {
            self.process(&block(first_height + i as u64, events)).await;
        }
    }

    pub fn reader(&self) -> MetadataReader {
        MetadataReader::new(Arc::new(self.store.clone()))
    }

    /// Every non-empty table, without the surrogate `id` column.
    pub fn state(&self) -> BTreeMap<String, Vec<Row>> {
        self.store
            .dump()
            .into_iter()
            .map(|(table, rows)| {
                let rows = rows
                    .into_iter()
                    .map(|mut row| {
                        row.remove("id");
                        row
                    })
                    .collect();
                (table, rows)
            })
            .collect()
    }
}
