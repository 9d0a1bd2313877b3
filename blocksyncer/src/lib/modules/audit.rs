// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Append-only log of bucket migrations, swap-outs and provider exits.
//!
//! Rows are keyed on the transaction hash and the event index, so a block
//! that is processed again writes the same rows again.

use async_trait::async_trait;
use bsdb::catalog::{self, TableDef, AUDIT_KEYS};
use bsdb::value::join_u32_csv;
use bsdb::{Lookup, Row, RowMutation};

use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::*;
use crate::registry::{catalog_tables, Extract, Handler, Module};

const EVENTS: &[&str] = &[
    EVENT_MIGRATION_BUCKET,
    EVENT_COMPLETE_MIGRATION_BUCKET,
    EVENT_CANCEL_MIGRATION_BUCKET,
    EVENT_REJECT_MIGRATE_BUCKET,
    EVENT_SWAP_OUT,
    EVENT_COMPLETE_SWAP_OUT,
    EVENT_CANCEL_SWAP_OUT,
    EVENT_STORAGE_PROVIDER_EXIT,
    EVENT_COMPLETE_STORAGE_PROVIDER_EXIT,
];

pub struct AuditModule;

impl Module for AuditModule {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn interested_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
        catalog_tables(&[
            catalog::EVENT_MIGRATION_BUCKET,
            catalog::EVENT_COMPLETE_MIGRATION_BUCKET,
            catalog::EVENT_CANCEL_MIGRATION_BUCKET,
            catalog::EVENT_REJECT_MIGRATE_BUCKET,
            catalog::EVENT_SWAP_OUT,
            catalog::EVENT_COMPLETE_SWAP_OUT,
            catalog::EVENT_CANCEL_SWAP_OUT,
            catalog::EVENT_STORAGE_PROVIDER_EXIT,
            catalog::EVENT_COMPLETE_STORAGE_PROVIDER_EXIT,
        ])
    }

    fn handler(&self) -> Handler<'_> {
        Handler::Extract(self)
    }
}

fn bucket(operator: &str, bucket_name: &str, bucket_id: &str) -> Row {
    Row::new()
        .with("operator", operator)
        .with("bucket_name", bucket_name)
        .with("bucket_id", bucket_id)
}

fn swap_out(sp_id: u32, family_id: u32, gvg_ids: &[u32]) -> Row {
    Row::new()
        .with("storage_provider_id", sp_id)
        .with("global_virtual_group_family_id", family_id)
        .with("global_virtual_group_ids", join_u32_csv(gvg_ids))
}

/// Audit table and row of `event`, `None` for events not audited.
fn audit_row(event: &Event) -> Option<(&'static str, Row)> {
    let entry = match event {
        Event::MigrationBucket(e) => (
            catalog::EVENT_MIGRATION_BUCKET,
            bucket(&e.operator, &e.bucket_name, &e.bucket_id)
                .with("dst_primary_sp_id", e.dst_primary_sp_id),
        ),
        Event::CompleteMigrationBucket(e) => (
            catalog::EVENT_COMPLETE_MIGRATION_BUCKET,
            bucket(&e.operator, &e.bucket_name, &e.bucket_id)
                .with(
                    "global_virtual_group_family_id",
                    e.global_virtual_group_family_id,
                )
                .with("src_primary_sp_id", e.src_primary_sp_id),
        ),
        Event::CancelMigrationBucket(e) => (
            catalog::EVENT_CANCEL_MIGRATION_BUCKET,
            bucket(&e.operator, &e.bucket_name, &e.bucket_id),
        ),
        Event::RejectMigrateBucket(e) => (
            catalog::EVENT_REJECT_MIGRATE_BUCKET,
            bucket(&e.operator, &e.bucket_name, &e.bucket_id),
        ),
        Event::SwapOut(e) => (
            catalog::EVENT_SWAP_OUT,
            swap_out(
                e.storage_provider_id,
                e.global_virtual_group_family_id,
                &e.global_virtual_group_ids,
            )
            .with("successor_sp_id", e.successor_sp_id),
        ),
        Event::CancelSwapOut(e) => (
            catalog::EVENT_CANCEL_SWAP_OUT,
            swap_out(
                e.storage_provider_id,
                e.global_virtual_group_family_id,
                &e.global_virtual_group_ids,
            )
            .with("successor_sp_id", e.successor_sp_id),
        ),
        Event::CompleteSwapOut(e) => (
            catalog::EVENT_COMPLETE_SWAP_OUT,
            swap_out(
                e.storage_provider_id,
                e.global_virtual_group_family_id,
                &e.global_virtual_group_ids,
            )
            .with("src_storage_provider_id", e.src_storage_provider_id),
        ),
        Event::StorageProviderExit(e) => (
            catalog::EVENT_STORAGE_PROVIDER_EXIT,
            Row::new()
                .with("storage_provider_id", e.storage_provider_id)
                .with("operator_address", &e.operator_address),
        ),
        Event::CompleteStorageProviderExit(e) => (
            catalog::EVENT_COMPLETE_STORAGE_PROVIDER_EXIT,
            Row::new()
                .with("storage_provider_id", e.storage_provider_id)
                .with("operator_address", &e.operator_address)
                .with("total_deposit", super::decimal(&e.total_deposit)),
        ),
        _ => return None,
    };
    Some(entry)
}

#[async_trait]
impl Extract for AuditModule {
    async fn extract(
        &self,
        ctx: &BlockContext,
        _lookup: &mut dyn Lookup,
        event: &Event,
    ) -> Result<Vec<RowMutation>, SyncError> {
        let Some((table, mut row)) = audit_row(event) else {
            return Ok(vec![]);
        };
        row.merge(&ctx.audit_fields());
        Ok(vec![RowMutation::upsert(table, &AUDIT_KEYS, row)])
    }
}
