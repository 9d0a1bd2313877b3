// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Domain modules materializing typed events into rows.

pub mod audit;
pub mod bucket;
pub mod group;
pub mod object;
pub mod payment;
pub mod permission;
pub mod prefix_tree;
pub mod storage_provider;
pub mod virtual_group;

use std::str::FromStr;

use bsdb::catalog::BUCKETS;
use bsdb::models::MIN_CHARGE_SIZE;
use bsdb::{Filter, Lookup, Row, RowMutation, Select};
use num_bigint::BigInt;

use crate::context::BlockContext;
use crate::error::SyncError;
use crate::registry::Registry;

/// Every module, in the order their handlers run for a shared event.
pub fn default_registry() -> Registry {
    Registry::new()
        .register(bucket::BucketModule)
        .register(object::ObjectModule)
        .register(prefix_tree::PrefixTreeModule)
        .register(group::GroupModule)
        .register(permission::PermissionModule)
        .register(payment::PaymentModule)
        .register(storage_provider::StorageProviderModule)
        .register(virtual_group::VirtualGroupModule)
        .register(audit::AuditModule)
}

/// `row` with the update columns of the current event.
pub(crate) fn touched(ctx: &BlockContext, mut row: Row) -> Row {
    row.merge(&ctx.update_fields());
    row
}

/// `row` with the create and update columns of the current event.
pub(crate) fn created(ctx: &BlockContext, mut row: Row) -> Row {
    row.merge(&ctx.create_fields());
    row
}

/// Charged size of an object, small objects are charged a minimum.
pub(crate) fn charge_size(payload_size: u64) -> u64 {
    payload_size.max(MIN_CHARGE_SIZE)
}

/// Decimal column text, absent amounts are stored as zero.
pub(crate) fn decimal(text: &str) -> &str {
    if text.is_empty() {
        "0"
    } else {
        text
    }
}

fn parse_size(column: &str, raw: &str) -> Result<BigInt, SyncError> {
    if raw.is_empty() {
        return Ok(BigInt::default());
    }
    BigInt::from_str(raw).map_err(|e| {
        SyncError::InvariantViolation(format!("bucket {column} {raw:?}: {e}"))
    })
}

/// Update of the size counters of `bucket_name` by the given deltas. The
/// counters never go below zero. `None` when the bucket is unknown.
pub(crate) async fn bucket_size_delta(
    ctx: &BlockContext,
    lookup: &mut dyn Lookup,
    bucket_name: &str,
    storage_delta: BigInt,
    charge_delta: BigInt,
) -> Result<Option<RowMutation>, SyncError> {
    let filter = Filter::new().eq("bucket_name", bucket_name);
    let Some(bucket) = lookup
        .select_one(&Select::from(BUCKETS).filter(filter.clone()))
        .await?
    else {
        return Ok(None);
    };
    let zero = BigInt::default();
    let storage = parse_size("storage_size", &bucket.text("storage_size")?)?
        + storage_delta;
    let charge =
        parse_size("charge_size", &bucket.text("charge_size")?)? + charge_delta;
    Ok(Some(RowMutation::update_where(
        BUCKETS,
        filter,
        touched(
            ctx,
            Row::new()
                .with("storage_size", storage.max(zero.clone()).to_string())
                .with("charge_size", charge.max(zero).to_string()),
        ),
    )))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers shared by the module tests.

    use std::sync::Arc;

    use bsdb::MemoryStore;

    use crate::chain::{AbciEvent, BlockData, BlockTx};
    use crate::dispatcher::Dispatcher;

    pub const OWNER: &str = "0x00000000000000000000000000000000000000aa";

    pub fn hex_id(n: u64) -> String {
        format!("0x{n:064x}")
    }

    pub fn quoted(v: impl std::fmt::Display) -> String {
        format!("\"{v}\"")
    }

    pub fn create_bucket(id: u64, name: &str) -> AbciEvent {
        AbciEvent::new("greenfield.storage.EventCreateBucket")
            .attr("bucket_id", quoted(id))
            .attr("bucket_name", quoted(name))
            .attr("owner", quoted(OWNER))
            .attr("visibility", quoted("VISIBILITY_TYPE_PRIVATE"))
            .attr("create_at", quoted(1_690_000_000))
    }

    pub fn create_object(id: u64, bucket: &str, name: &str, size: u64) -> AbciEvent {
        AbciEvent::new("greenfield.storage.EventCreateObject")
            .attr("object_id", quoted(id))
            .attr("bucket_id", quoted(1))
            .attr("bucket_name", quoted(bucket))
            .attr("object_name", quoted(name))
            .attr("owner", quoted(OWNER))
            .attr("creator", quoted(OWNER))
            .attr("payload_size", quoted(size))
            .attr("visibility", quoted("VISIBILITY_TYPE_INHERIT"))
            .attr("status", quoted("OBJECT_STATUS_CREATED"))
    }

    pub fn object_event(kind: &str, id: u64, bucket: &str, name: &str) -> AbciEvent {
        AbciEvent::new(&format!("greenfield.storage.{kind}"))
            .attr("object_id", quoted(id))
            .attr("bucket_name", quoted(bucket))
            .attr("object_name", quoted(name))
            .attr("operator", quoted(OWNER))
    }

    pub fn seal_object(id: u64, bucket: &str, name: &str) -> AbciEvent {
        object_event("EventSealObject", id, bucket, name)
            .attr("status", quoted("OBJECT_STATUS_SEALED"))
            .attr("local_virtual_group_id", "3")
            .attr("checksums", r#"["AQI=","AwQ="]"#)
    }

    /// A store with every table and a dispatcher over the default modules.
    pub async fn setup() -> (Dispatcher, MemoryStore) {
        let store = MemoryStore::new();
        let registry = Arc::new(super::default_registry());
        registry.prepare_tables(&store).await.unwrap();
        (Dispatcher::new(registry), store)
    }

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

    /// Process consecutive blocks, one per event list.
    pub async fn run_blocks(
        dispatcher: &Dispatcher,
        store: &MemoryStore,
        first_height: u64,
        blocks: Vec<Vec<AbciEvent>>,
    ) {
        for (i, events) in blocks.into_iter().enumerate() {
            dispatcher
                .process_block(store, &block(first_height + i as u64, events))
                .await
                .unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_size_has_a_floor() {
        assert_eq!(charge_size(0), 128_000);
        assert_eq!(charge_size(5), 128_000);
        assert_eq!(charge_size(200_000), 200_000);
    }

    #[test]
    fn test_default_registry_routes_shared_events() {
        let registry = default_registry();
        let names = |event: &str| {
            registry
                .modules_for(event)
                .iter()
                .map(|m| m.name())
                .collect::<Vec<_>>()
        };
        assert_eq!(
            names(crate::events::EVENT_CREATE_OBJECT),
            vec!["object", "prefix_tree"]
        );
        assert_eq!(
            names(crate::events::EVENT_COMPLETE_MIGRATION_BUCKET),
            vec!["bucket", "audit"]
        );
        assert_eq!(
            names(crate::events::EVENT_COMPLETE_STORAGE_PROVIDER_EXIT),
            vec!["storage_provider", "audit"]
        );
        for event in crate::events::ALL_EVENTS {
            assert!(registry.is_interested(event), "{event} is not routed");
        }
    }
}
