// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Typed views of catalog rows, returned by the read side.

use serde::Serialize;

use crate::value::{split_checksums, split_strings, split_u32_csv, Row};
use crate::DbError;

pub const VISIBILITY_PUBLIC_READ: &str = "PUBLIC_READ";
pub const VISIBILITY_PRIVATE: &str = "PRIVATE";
pub const VISIBILITY_INHERIT: &str = "INHERIT";

pub const BUCKET_STATUS_CREATED: &str = "CREATED";
pub const BUCKET_STATUS_DISCONTINUED: &str = "DISCONTINUED";
pub const BUCKET_STATUS_MIGRATING: &str = "MIGRATING";

pub const OBJECT_STATUS_CREATED: &str = "CREATED";
pub const OBJECT_STATUS_SEALED: &str = "SEALED";
pub const OBJECT_STATUS_DISCONTINUED: &str = "DISCONTINUED";

/// Bits of `buckets.off_chain_status`.
pub const OFF_CHAIN_STATUS_IS_LIMITED: i64 = 1;
pub const OFF_CHAIN_STATUS_SP_AS_DELEGATED_AGENT_DISABLED: i64 = 1 << 1;

/// Minimum charged size of an object, in bytes.
pub const MIN_CHARGE_SIZE: u64 = 128_000;

/// Decode a typed model from a catalog row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, DbError>;
}

/// Decode every row, failing on the first bad one.
pub fn decode_all<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, DbError> {
    rows.iter().map(T::from_row).collect()
}

/// Creation and last update coordinates shared by most entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Tracking {
    pub create_at: i64,
    pub create_tx_hash: String,
    pub create_time: i64,
    pub update_at: i64,
    pub update_tx_hash: String,
    pub update_time: i64,
}

impl FromRow for Tracking {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            create_at: row.int("create_at")?,
            create_tx_hash: row.text("create_tx_hash")?,
            create_time: row.int("create_time")?,
            update_at: row.int("update_at")?,
            update_tx_hash: row.text("update_tx_hash")?,
            update_time: row.int("update_time")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub bucket_id: String,
    pub bucket_name: String,
    pub owner: String,
    pub operator: String,
    pub payment_address: String,
    pub global_virtual_group_family_id: u32,
    pub visibility: String,
    pub status: String,
    pub source_type: String,
    pub charged_read_quota: u64,
    pub delete_reason: String,
    pub delete_at: i64,
    pub off_chain_status: i64,
    /// Decimal text.
    pub storage_size: String,
    /// Decimal text.
    pub charge_size: String,
    pub removed: bool,
    #[serde(flatten)]
    pub tracking: Tracking,
}

impl FromRow for Bucket {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            bucket_id: row.text("bucket_id")?,
            bucket_name: row.text("bucket_name")?,
            owner: row.text("owner")?,
            operator: row.text("operator")?,
            payment_address: row.text("payment_address")?,
            global_virtual_group_family_id: u32_of(
                row,
                "global_virtual_group_family_id",
            )?,
            visibility: row.text("visibility")?,
            status: row.text("status")?,
            source_type: row.text("source_type")?,
            charged_read_quota: row.uint("charged_read_quota")?,
            delete_reason: row.text("delete_reason")?,
            delete_at: row.int("delete_at")?,
            off_chain_status: row.int("off_chain_status")?,
            storage_size: row.text("storage_size")?,
            charge_size: row.text("charge_size")?,
            removed: row.boolean("removed")?,
            tracking: Tracking::from_row(row)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Object {
    pub object_id: String,
    pub bucket_id: String,
    pub bucket_name: String,
    pub object_name: String,
    pub owner: String,
    pub creator: String,
    pub operator: String,
    pub updater: String,
    pub local_virtual_group_id: u32,
    pub payload_size: u64,
    pub visibility: String,
    pub content_type: String,
    pub status: String,
    pub redundancy_type: String,
    pub source_type: String,
    pub checksums: Vec<Vec<u8>>,
    pub sealed_tx_hash: String,
    pub delete_reason: String,
    pub delete_at: i64,
    pub is_updating: bool,
    pub content_updated_time: i64,
    pub version: i64,
    pub removed: bool,
    #[serde(flatten)]
    pub tracking: Tracking,
}

impl FromRow for Object {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            object_id: row.text("object_id")?,
            bucket_id: row.text("bucket_id")?,
            bucket_name: row.text("bucket_name")?,
            object_name: row.text("object_name")?,
            owner: row.text("owner")?,
            creator: row.text("creator")?,
            operator: row.text("operator")?,
            updater: row.text("updater")?,
            local_virtual_group_id: u32_of(row, "local_virtual_group_id")?,
            payload_size: row.uint("payload_size")?,
            visibility: row.text("visibility")?,
            content_type: row.text("content_type")?,
            status: row.text("status")?,
            redundancy_type: row.text("redundancy_type")?,
            source_type: row.text("source_type")?,
            checksums: split_checksums(&row.text("checksums")?)?,
            sealed_tx_hash: row.text("sealed_tx_hash")?,
            delete_reason: row.text("delete_reason")?,
            delete_at: row.int("delete_at")?,
            is_updating: row.boolean("is_updating")?,
            content_updated_time: row.int("content_updated_time")?,
            version: row.int("version")?,
            removed: row.boolean("removed")?,
            tracking: Tracking::from_row(row)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub group_id: String,
    pub account_id: String,
    pub group_name: String,
    pub owner: String,
    pub operator: String,
    pub source_type: String,
    pub extra: String,
    pub expiration_time: i64,
    pub removed: bool,
    #[serde(flatten)]
    pub tracking: Tracking,
}

impl FromRow for Group {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            group_id: row.text("group_id")?,
            account_id: row.text("account_id")?,
            group_name: row.text("group_name")?,
            owner: row.text("owner")?,
            operator: row.text("operator")?,
            source_type: row.text("source_type")?,
            extra: row.text("extra")?,
            expiration_time: row.int("expiration_time")?,
            removed: row.boolean("removed")?,
            tracking: Tracking::from_row(row)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub principal_type: i64,
    pub principal_value: String,
    pub resource_type: String,
    pub resource_id: String,
    pub policy_id: String,
    pub create_timestamp: i64,
    pub update_timestamp: i64,
    pub expiration_time: i64,
    pub removed: bool,
}

impl FromRow for Permission {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            principal_type: row.int("principal_type")?,
            principal_value: row.text("principal_value")?,
            resource_type: row.text("resource_type")?,
            resource_id: row.text("resource_id")?,
            policy_id: row.text("policy_id")?,
            create_timestamp: row.int("create_timestamp")?,
            update_timestamp: row.int("update_timestamp")?,
            expiration_time: row.int("expiration_time")?,
            removed: row.boolean("removed")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub policy_id: String,
    pub statement_index: i64,
    pub effect: String,
    pub action_value: i64,
    pub resources: Vec<String>,
    pub expiration_time: i64,
    pub limit_size: u64,
    pub removed: bool,
}

impl FromRow for Statement {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            policy_id: row.text("policy_id")?,
            statement_index: row.int("statement_index")?,
            effect: row.text("effect")?,
            action_value: row.int("action_value")?,
            resources: split_strings(&row.text("resources")?),
            expiration_time: row.int("expiration_time")?,
            limit_size: row.uint("limit_size")?,
            removed: row.boolean("removed")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamRecord {
    pub account: String,
    pub crud_timestamp: i64,
    pub netflow_rate: String,
    pub frozen_netflow_rate: String,
    pub static_balance: String,
    pub buffer_balance: String,
    pub lock_balance: String,
    pub status: String,
    pub settle_timestamp: i64,
    pub out_flow_count: u64,
}

impl FromRow for StreamRecord {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            account: row.text("account")?,
            crud_timestamp: row.int("crud_timestamp")?,
            netflow_rate: row.text("netflow_rate")?,
            frozen_netflow_rate: row.text("frozen_netflow_rate")?,
            static_balance: row.text("static_balance")?,
            buffer_balance: row.text("buffer_balance")?,
            lock_balance: row.text("lock_balance")?,
            status: row.text("status")?,
            settle_timestamp: row.int("settle_timestamp")?,
            out_flow_count: row.uint("out_flow_count")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentAccount {
    pub addr: String,
    pub owner: String,
    pub refundable: bool,
    pub update_at: i64,
    pub update_time: i64,
}

impl FromRow for PaymentAccount {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            addr: row.text("addr")?,
            owner: row.text("owner")?,
            refundable: row.boolean("refundable")?,
            update_at: row.int("update_at")?,
            update_time: row.int("update_time")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageProvider {
    pub sp_id: u32,
    pub operator_address: String,
    pub funding_address: String,
    pub seal_address: String,
    pub approval_address: String,
    pub gc_address: String,
    pub bls_key: String,
    pub total_deposit: String,
    pub status: String,
    pub endpoint: String,
    pub moniker: String,
    pub identity: String,
    pub website: String,
    pub security_contact: String,
    pub details: String,
    pub read_price: String,
    pub free_read_quota: u64,
    pub store_price: String,
    pub price_update_time: i64,
    pub removed: bool,
}

impl FromRow for StorageProvider {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            sp_id: u32_of(row, "sp_id")?,
            operator_address: row.text("operator_address")?,
            funding_address: row.text("funding_address")?,
            seal_address: row.text("seal_address")?,
            approval_address: row.text("approval_address")?,
            gc_address: row.text("gc_address")?,
            bls_key: row.text("bls_key")?,
            total_deposit: row.text("total_deposit")?,
            status: row.text("status")?,
            endpoint: row.text("endpoint")?,
            moniker: row.text("moniker")?,
            identity: row.text("identity")?,
            website: row.text("website")?,
            security_contact: row.text("security_contact")?,
            details: row.text("details")?,
            read_price: row.text("read_price")?,
            free_read_quota: row.uint("free_read_quota")?,
            store_price: row.text("store_price")?,
            price_update_time: row.int("price_update_time")?,
            removed: row.boolean("removed")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalVirtualGroup {
    pub global_virtual_group_id: u32,
    pub family_id: u32,
    pub primary_sp_id: u32,
    pub secondary_sp_ids: Vec<u32>,
    pub stored_size: u64,
    pub virtual_payment_address: String,
    pub total_deposit: String,
    pub removed: bool,
}

impl FromRow for GlobalVirtualGroup {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            global_virtual_group_id: u32_of(row, "global_virtual_group_id")?,
            family_id: u32_of(row, "family_id")?,
            primary_sp_id: u32_of(row, "primary_sp_id")?,
            secondary_sp_ids: split_u32_csv(&row.text("secondary_sp_ids")?)?,
            stored_size: row.uint("stored_size")?,
            virtual_payment_address: row.text("virtual_payment_address")?,
            total_deposit: row.text("total_deposit")?,
            removed: row.boolean("removed")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalVirtualGroup {
    pub local_virtual_group_id: u32,
    pub bucket_id: String,
    pub global_virtual_group_id: u32,
    pub stored_size: u64,
    pub removed: bool,
}

impl FromRow for LocalVirtualGroup {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            local_virtual_group_id: u32_of(row, "local_virtual_group_id")?,
            bucket_id: row.text("bucket_id")?,
            global_virtual_group_id: u32_of(row, "global_virtual_group_id")?,
            stored_size: row.uint("stored_size")?,
            removed: row.boolean("removed")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalVirtualGroupFamily {
    pub global_virtual_group_family_id: u32,
    pub primary_sp_id: u32,
    pub global_virtual_group_ids: Vec<u32>,
    pub virtual_payment_address: String,
    pub removed: bool,
}

impl FromRow for GlobalVirtualGroupFamily {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            global_virtual_group_family_id: u32_of(
                row,
                "global_virtual_group_family_id",
            )?,
            primary_sp_id: u32_of(row, "primary_sp_id")?,
            global_virtual_group_ids: split_u32_csv(
                &row.text("global_virtual_group_ids")?,
            )?,
            virtual_payment_address: row.text("virtual_payment_address")?,
            removed: row.boolean("removed")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixTreeNode {
    pub bucket_name: String,
    pub path_name: String,
    pub full_name: String,
    pub name: String,
    pub is_object: bool,
    pub is_folder: bool,
    pub object_id: String,
    pub object_name: String,
}

impl FromRow for PrefixTreeNode {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            bucket_name: row.text("bucket_name")?,
            path_name: row.text("path_name")?,
            full_name: row.text("full_name")?,
            name: row.text("name")?,
            is_object: row.boolean("is_object")?,
            is_folder: row.boolean("is_folder")?,
            object_id: row.text("object_id")?,
            object_name: row.text("object_name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Epoch {
    pub block_height: i64,
    pub block_hash: String,
    pub update_time: i64,
}

impl FromRow for Epoch {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            block_height: row.int("block_height")?,
            block_hash: row.text("block_hash")?,
            update_time: row.int("update_time")?,
        })
    }
}

fn u32_of(row: &Row, column: &str) -> Result<u32, DbError> {
    let v = row.int(column)?;
    u32::try_from(v).map_err(|_| {
        DbError::Decode(format!("column {column} is not a uint32: {v}"))
    })
}
