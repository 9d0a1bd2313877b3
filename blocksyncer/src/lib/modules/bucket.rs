// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use async_trait::async_trait;
use bsdb::catalog::{TableDef, BUCKETS};
use bsdb::models::{
    BUCKET_STATUS_CREATED, BUCKET_STATUS_DISCONTINUED, BUCKET_STATUS_MIGRATING,
    OFF_CHAIN_STATUS_IS_LIMITED,
    OFF_CHAIN_STATUS_SP_AS_DELEGATED_AGENT_DISABLED,
};
use bsdb::{Filter, Lookup, Row, RowMutation, Select};

use super::{created, touched};
use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::storage::EventCreateBucket;
use crate::events::*;
use crate::registry::{catalog_tables, Extract, Handler, Module};

const EVENTS: &[&str] = &[
    EVENT_CREATE_BUCKET,
    EVENT_DELETE_BUCKET,
    EVENT_UPDATE_BUCKET_INFO,
    EVENT_DISCONTINUE_BUCKET,
    EVENT_MIGRATION_BUCKET,
    EVENT_COMPLETE_MIGRATION_BUCKET,
    EVENT_CANCEL_MIGRATION_BUCKET,
    EVENT_REJECT_MIGRATE_BUCKET,
    EVENT_TOGGLE_SP_AS_DELEGATED_AGENT,
    EVENT_BUCKET_FLOW_RATE_LIMIT_STATUS,
];

pub struct BucketModule;

impl Module for BucketModule {
    fn name(&self) -> &'static str {
        "bucket"
    }

    fn interested_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
        catalog_tables(&[BUCKETS])
    }

    fn handler(&self) -> Handler<'_> {
        Handler::Extract(self)
    }
}

fn by_id(bucket_id: &str) -> Filter {
    Filter::new().eq("bucket_id", bucket_id)
}

fn set(ctx: &BlockContext, filter: Filter, row: Row) -> RowMutation {
    RowMutation::update_where(BUCKETS, filter, touched(ctx, row))
}

fn set_status(ctx: &BlockContext, bucket_id: &str, status: &str) -> RowMutation {
    set(ctx, by_id(bucket_id), Row::new().with("status", status))
}

fn create(ctx: &BlockContext, e: &EventCreateBucket) -> RowMutation {
    let mut row = created(
        ctx,
        Row::new()
            .with("bucket_id", &e.bucket_id)
            .with("bucket_name", &e.bucket_name)
            .with("owner", &e.owner)
            .with("operator", &e.owner)
            .with("payment_address", &e.payment_address)
            .with(
                "global_virtual_group_family_id",
                e.global_virtual_group_family_id,
            )
            .with("visibility", e.visibility.as_str())
            .with("status", e.status.as_str())
            .with("source_type", e.source_type.as_str())
            .with("charged_read_quota", e.charged_read_quota)
            .with("delete_reason", "")
            .with("delete_at", 0i64)
            .with("off_chain_status", 0i64)
            .with("storage_size", "0")
            .with("charge_size", "0")
            .with("removed", false),
    );
    // The chain records its own creation time
    row.set("create_time", e.create_at);
    RowMutation::upsert(BUCKETS, &["bucket_id"], row)
}

/// Set or clear `bit` of the bucket's off-chain status.
async fn toggle_off_chain_bit(
    ctx: &BlockContext,
    lookup: &mut dyn Lookup,
    filter: Filter,
    bit: i64,
    on: bool,
) -> Result<Vec<RowMutation>, SyncError> {
    let current = match lookup
        .select_one(&Select::from(BUCKETS).filter(filter.clone()))
        .await?
    {
        Some(row) => row.int("off_chain_status")?,
        None => return Ok(vec![]),
    };
    let status = if on { current | bit } else { current & !bit };
    Ok(vec![set(
        ctx,
        filter,
        Row::new().with("off_chain_status", status),
    )])
}

#[async_trait]
impl Extract for BucketModule {
    async fn extract(
        &self,
        ctx: &BlockContext,
        lookup: &mut dyn Lookup,
        event: &Event,
    ) -> Result<Vec<RowMutation>, SyncError> {
        let mutation = match event {
            Event::CreateBucket(e) => {
                // Bucket ids are never reused: a known id is a replay, and
                // recreating the row would reset its size counters
                let known = lookup
                    .select_one(
                        &Select::from(BUCKETS).filter(by_id(&e.bucket_id)),
                    )
                    .await?
                    .is_some();
                if known {
                    return Ok(vec![]);
                }
                create(ctx, e)
            }
            Event::DeleteBucket(e) => set(
                ctx,
                by_id(&e.bucket_id),
                Row::new().with("operator", &e.operator).with("removed", true),
            ),
            Event::UpdateBucketInfo(e) => set(
                ctx,
                by_id(&e.bucket_id),
                Row::new()
                    .with("charged_read_quota", e.charged_read_quota)
                    .with("payment_address", &e.payment_address)
                    .with("visibility", e.visibility.as_str())
                    .with(
                        "global_virtual_group_family_id",
                        e.global_virtual_group_family_id,
                    ),
            ),
            Event::DiscontinueBucket(e) => set(
                ctx,
                by_id(&e.bucket_id),
                Row::new()
                    .with("status", BUCKET_STATUS_DISCONTINUED)
                    .with("delete_reason", &e.reason)
                    .with("delete_at", e.delete_at),
            ),
            Event::MigrationBucket(e) => {
                set_status(ctx, &e.bucket_id, BUCKET_STATUS_MIGRATING)
            }
            Event::CompleteMigrationBucket(e) => set(
                ctx,
                by_id(&e.bucket_id),
                Row::new()
                    .with(
                        "global_virtual_group_family_id",
                        e.global_virtual_group_family_id,
                    )
                    .with("status", BUCKET_STATUS_CREATED),
            ),
            Event::CancelMigrationBucket(e) | Event::RejectMigrateBucket(e) => {
                set_status(ctx, &e.bucket_id, BUCKET_STATUS_CREATED)
            }
            Event::ToggleSPAsDelegatedAgent(e) => {
                return toggle_off_chain_bit(
                    ctx,
                    lookup,
                    by_id(&e.bucket_id),
                    OFF_CHAIN_STATUS_SP_AS_DELEGATED_AGENT_DISABLED,
                    e.sp_as_delegated_agent_disabled,
                )
                .await
            }
            Event::BucketFlowRateLimitStatus(e) => {
                return toggle_off_chain_bit(
                    ctx,
                    lookup,
                    Filter::new().eq("bucket_name", &e.bucket_name),
                    OFF_CHAIN_STATUS_IS_LIMITED,
                    e.is_limited,
                )
                .await
            }
            _ => return Ok(vec![]),
        };
        Ok(vec![mutation])
    }
}
