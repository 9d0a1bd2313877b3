// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Objects, sharded by bucket name, and the map from object id to bucket.
//!
//! The module writes through the block transaction: most events read the
//! object row before updating it, and seal, delete, copy and content updates
//! also move the size counters of the owning bucket.

use async_trait::async_trait;
use bsdb::catalog::{self, TableDef, BUCKETS, OBJECT_ID_MAP};
use bsdb::models::{
    OBJECT_STATUS_CREATED, OBJECT_STATUS_DISCONTINUED, OBJECT_STATUS_SEALED,
};
use bsdb::value::join_checksums;
use bsdb::{shard, Filter, Lookup, Row, RowMutation, Select, StoreTx};
use num_bigint::BigInt;
use tracing::debug;

use super::{bucket_size_delta, charge_size, created, touched};
use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::storage::{EventCopyObject, EventCreateObject};
use crate::events::*;
use crate::registry::{apply, Direct, Handler, Module};

const EVENTS: &[&str] = &[
    EVENT_CREATE_OBJECT,
    EVENT_SEAL_OBJECT,
    EVENT_CANCEL_CREATE_OBJECT,
    EVENT_COPY_OBJECT,
    EVENT_DELETE_OBJECT,
    EVENT_REJECT_SEAL_OBJECT,
    EVENT_DISCONTINUE_OBJECT,
    EVENT_UPDATE_OBJECT_INFO,
    EVENT_UPDATE_OBJECT_CONTENT,
    EVENT_UPDATE_OBJECT_CONTENT_SUCCESS,
    EVENT_CANCEL_UPDATE_OBJECT_CONTENT,
];

pub struct ObjectModule;

impl Module for ObjectModule {
    fn name(&self) -> &'static str {
        "object"
    }

    fn interested_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
        let mut tables = catalog::objects_tables();
        tables.extend(crate::registry::catalog_tables(&[OBJECT_ID_MAP])?);
        Ok(tables)
    }

    fn handler(&self) -> Handler<'_> {
        Handler::Direct(self)
    }
}

fn by_id(object_id: &str) -> Filter {
    Filter::new().eq("object_id", object_id)
}

/// The object row, looked up in the shard of its bucket.
async fn find(
    lookup: &mut dyn Lookup,
    bucket_name: &str,
    object_id: &str,
) -> Result<Option<Row>, SyncError> {
    let select =
        Select::from(&shard::table_of(bucket_name)).filter(by_id(object_id));
    Ok(lookup.select_one(&select).await?)
}

/// Size counted in the bucket for a sealed, live object row.
fn counted_size(row: &Row) -> Result<Option<u64>, SyncError> {
    let sealed = row.text("status")? == OBJECT_STATUS_SEALED;
    if sealed && !row.boolean("removed")? {
        Ok(Some(row.uint("payload_size")?))
    } else {
        Ok(None)
    }
}

impl ObjectModule {
    async fn set(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        bucket_name: &str,
        object_id: &str,
        row: Row,
    ) -> Result<(), SyncError> {
        let mutation = RowMutation::update_where(
            &shard::table_of(bucket_name),
            by_id(object_id),
            touched(ctx, row),
        );
        apply(ctx, tx, &mutation).await?;
        Ok(())
    }

    async fn move_bucket_size(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        bucket_name: &str,
        storage_delta: BigInt,
        charge_delta: BigInt,
    ) -> Result<(), SyncError> {
        let mutation = bucket_size_delta(
            ctx,
            tx.as_lookup(),
            bucket_name,
            storage_delta,
            charge_delta,
        )
        .await?;
        match mutation {
            Some(m) => {
                apply(ctx, tx, &m).await?;
            }
            None => debug!("No bucket {bucket_name} to account sizes on"),
        }
        Ok(())
    }

    /// Insert the object row and its id mapping.
    async fn insert(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        row: Row,
    ) -> Result<(), SyncError> {
        let bucket_name = row.text("bucket_name")?;
        let object_id = row.text("object_id")?;
        let table = shard::table_of(&bucket_name);
        apply(ctx, tx, &RowMutation::upsert(&table, &["object_id"], row))
            .await?;
        let mapping = Row::new()
            .with("object_id", &object_id)
            .with("bucket_name", &bucket_name);
        let mapping =
            RowMutation::upsert(OBJECT_ID_MAP, &["object_id"], mapping);
        apply(ctx, tx, &mapping).await?;
        Ok(())
    }

    /// Object ids are never reused, so an existing row means the block is
    /// replayed and later events already moved it on.
    async fn create(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        e: &EventCreateObject,
    ) -> Result<(), SyncError> {
        if find(tx.as_lookup(), &e.bucket_name, &e.object_id)
            .await?
            .is_some()
        {
            debug!(object_id = %e.object_id, "Object already indexed");
            return Ok(());
        }
        let mut row = created(
            ctx,
            Row::new()
                .with("object_id", &e.object_id)
                .with("bucket_id", &e.bucket_id)
                .with("bucket_name", &e.bucket_name)
                .with("object_name", &e.object_name)
                .with("owner", &e.owner)
                .with("creator", &e.creator)
                .with("operator", &e.creator)
                .with("updater", &e.creator)
                .with("local_virtual_group_id", 0i64)
                .with("payload_size", e.payload_size)
                .with("visibility", e.visibility.as_str())
                .with("content_type", &e.content_type)
                .with("status", e.status.as_str())
                .with("redundancy_type", e.redundancy_type.as_str())
                .with("source_type", e.source_type.as_str())
                .with("checksums", join_checksums(&e.checksums))
                .with("sealed_tx_hash", "")
                .with("delete_reason", "")
                .with("delete_at", 0i64)
                .with("is_updating", false)
                .with("content_updated_time", e.create_at)
                .with("version", 0i64)
                .with("removed", false),
        );
        row.set("create_time", e.create_at);
        self.insert(ctx, tx, row).await
    }

    async fn copy(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        e: &EventCopyObject,
    ) -> Result<(), SyncError> {
        let Some(mut row) =
            find(tx.as_lookup(), &e.src_bucket_name, &e.src_object_id).await?
        else {
            return Err(SyncError::InvariantViolation(format!(
                "copy source {} missing in bucket {}",
                e.src_object_id, e.src_bucket_name
            )));
        };
        let existed =
            find(tx.as_lookup(), &e.dst_bucket_name, &e.dst_object_id)
                .await?
                .is_some();
        let dst_bucket_id = tx
            .as_lookup()
            .select_one(
                &Select::from(BUCKETS)
                    .filter(Filter::new().eq("bucket_name", &e.dst_bucket_name)),
            )
            .await?
            .map(|b| b.text("bucket_id"))
            .transpose()?
            .unwrap_or_default();

        let payload_size = row.uint("payload_size")?;
        let empty = payload_size == 0;
        row.remove("id");
        row.merge(&ctx.create_fields());
        row.merge(
            &Row::new()
                .with("object_id", &e.dst_object_id)
                .with("bucket_id", dst_bucket_id)
                .with("bucket_name", &e.dst_bucket_name)
                .with("object_name", &e.dst_object_name)
                .with("owner", &e.operator)
                .with("creator", &e.operator)
                .with("operator", &e.operator)
                .with("updater", &e.operator)
                .with(
                    "status",
                    if empty {
                        OBJECT_STATUS_SEALED
                    } else {
                        OBJECT_STATUS_CREATED
                    },
                )
                .with(
                    "sealed_tx_hash",
                    if empty { ctx.tx_hash.as_str() } else { "" },
                )
                .with("delete_reason", "")
                .with("delete_at", 0i64)
                .with("is_updating", false)
                .with("content_updated_time", ctx.block_time)
                .with("removed", false),
        );
        self.insert(ctx, tx, row).await?;

        // An empty copy is sealed right away and charged the minimum
        if empty && !existed {
            self.move_bucket_size(
                ctx,
                tx,
                &e.dst_bucket_name,
                BigInt::default(),
                BigInt::from(charge_size(0)),
            )
            .await?;
        }
        Ok(())
    }

    /// Mark the object removed and release its size if it was counted.
    async fn remove(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        bucket_name: &str,
        object_id: &str,
        operator: &str,
    ) -> Result<(), SyncError> {
        let counted = match find(tx.as_lookup(), bucket_name, object_id).await? {
            Some(row) => counted_size(&row)?,
            None => None,
        };
        self.set(
            ctx,
            tx,
            bucket_name,
            object_id,
            Row::new().with("operator", operator).with("removed", true),
        )
        .await?;
        if let Some(size) = counted {
            self.move_bucket_size(
                ctx,
                tx,
                bucket_name,
                -BigInt::from(size),
                -BigInt::from(charge_size(size)),
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Direct for ObjectModule {
    async fn handle(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        event: &Event,
    ) -> Result<(), SyncError> {
        match event {
            Event::CreateObject(e) => self.create(ctx, tx, e).await,
            Event::SealObject(e) => {
                let before =
                    find(tx.as_lookup(), &e.bucket_name, &e.object_id).await?;
                let was_sealed = match &before {
                    Some(row) => row.text("status")? == OBJECT_STATUS_SEALED,
                    None => false,
                };
                let tx_hash = ctx.tx_hash.clone();
                self.set(
                    ctx,
                    tx,
                    &e.bucket_name,
                    &e.object_id,
                    Row::new()
                        .with("operator", &e.operator)
                        .with("status", e.status.as_str())
                        .with("sealed_tx_hash", tx_hash)
                        .with("checksums", join_checksums(&e.checksums))
                        .with("local_virtual_group_id", e.local_virtual_group_id)
                        .with("removed", false),
                )
                .await?;
                if let (Some(row), false) = (before, was_sealed) {
                    let size = row.uint("payload_size")?;
                    self.move_bucket_size(
                        ctx,
                        tx,
                        &e.bucket_name,
                        BigInt::from(size),
                        BigInt::from(charge_size(size)),
                    )
                    .await?;
                }
                Ok(())
            }
            Event::CancelCreateObject(e) => {
                self.remove(ctx, tx, &e.bucket_name, &e.object_id, &e.operator)
                    .await
            }
            Event::DeleteObject(e) => {
                self.remove(ctx, tx, &e.bucket_name, &e.object_id, &e.operator)
                    .await
            }
            Event::RejectSealObject(e) if e.for_update => {
                self.set(
                    ctx,
                    tx,
                    &e.bucket_name,
                    &e.object_id,
                    Row::new().with("is_updating", false),
                )
                .await
            }
            Event::RejectSealObject(e) => {
                self.remove(ctx, tx, &e.bucket_name, &e.object_id, &e.operator)
                    .await
            }
            Event::CopyObject(e) => self.copy(ctx, tx, e).await,
            Event::DiscontinueObject(e) => {
                for object_id in &e.object_ids {
                    self.set(
                        ctx,
                        tx,
                        &e.bucket_name,
                        object_id,
                        Row::new()
                            .with("status", OBJECT_STATUS_DISCONTINUED)
                            .with("delete_reason", &e.reason)
                            .with("delete_at", e.delete_at),
                    )
                    .await?;
                }
                Ok(())
            }
            Event::UpdateObjectInfo(e) => {
                self.set(
                    ctx,
                    tx,
                    &e.bucket_name,
                    &e.object_id,
                    Row::new()
                        .with("operator", &e.operator)
                        .with("visibility", e.visibility.as_str()),
                )
                .await
            }
            Event::UpdateObjectContent(e) => {
                self.set(
                    ctx,
                    tx,
                    &e.bucket_name,
                    &e.object_id,
                    Row::new()
                        .with("updater", &e.operator)
                        .with("is_updating", true),
                )
                .await
            }
            Event::UpdateObjectContentSuccess(e) => {
                let row =
                    find(tx.as_lookup(), &e.bucket_name, &e.object_id).await?;
                let counted = match row {
                    Some(row) => counted_size(&row)?,
                    None => None,
                };
                self.set(
                    ctx,
                    tx,
                    &e.bucket_name,
                    &e.object_id,
                    Row::new()
                        .with("updater", &e.operator)
                        .with("content_type", &e.content_type)
                        .with("payload_size", e.new_payload_size)
                        .with("checksums", join_checksums(&e.new_checksums))
                        .with("version", e.version)
                        .with("content_updated_time", e.updated_at)
                        .with("is_updating", false),
                )
                .await?;
                if let Some(old) = counted {
                    let new = e.new_payload_size;
                    self.move_bucket_size(
                        ctx,
                        tx,
                        &e.bucket_name,
                        BigInt::from(new) - BigInt::from(old),
                        BigInt::from(charge_size(new))
                            - BigInt::from(charge_size(old)),
                    )
                    .await?;
                }
                Ok(())
            }
            Event::CancelUpdateObjectContent(e) => {
                self.set(
                    ctx,
                    tx,
                    &e.bucket_name,
                    &e.object_id,
                    Row::new()
                        .with("updater", &e.operator)
                        .with("is_updating", false),
                )
                .await
            }
            _ => Ok(()),
        }
    }
}
