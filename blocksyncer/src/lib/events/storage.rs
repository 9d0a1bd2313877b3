// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Events of the storage module: buckets, objects and groups.

use serde::Deserialize;
use serde_with::serde_as;

use super::codec::{
    chain_enum, AddressHex, Base64Bytes, Num, Timestamp, Uint256Hex,
};

chain_enum! {
    pub enum Visibility : "VISIBILITY_TYPE_" {
        #[default]
        Unspecified = 0 => "UNSPECIFIED",
        PublicRead = 1 => "PUBLIC_READ",
        Private = 2 => "PRIVATE",
        Inherit = 3 => "INHERIT",
    }
}

chain_enum! {
    pub enum BucketStatus : "BUCKET_STATUS_" {
        #[default]
        Created = 0 => "CREATED",
        Discontinued = 1 => "DISCONTINUED",
        Migrating = 2 => "MIGRATING",
    }
}

chain_enum! {
    pub enum ObjectStatus : "OBJECT_STATUS_" {
        #[default]
        Created = 0 => "CREATED",
        Sealed = 1 => "SEALED",
        Discontinued = 2 => "DISCONTINUED",
    }
}

chain_enum! {
    pub enum RedundancyType : "REDUNDANCY_" {
        #[default]
        EcType = 0 => "EC_TYPE",
        ReplicaType = 1 => "REPLICA_TYPE",
    }
}

chain_enum! {
    pub enum SourceType : "SOURCE_TYPE_" {
        #[default]
        Origin = 0 => "ORIGIN",
        MirrorPending = 1 => "MIRROR_PENDING",
        BscCrossChain = 2 => "BSC_CROSS_CHAIN",
        OpCrossChain = 3 => "OP_CROSS_CHAIN",
    }
}

// Buckets

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCreateBucket {
    #[serde_as(as = "AddressHex")]
    pub owner: String,
    pub bucket_name: String,
    pub visibility: Visibility,
    /// Unix seconds.
    #[serde_as(as = "Num")]
    pub create_at: i64,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
    pub source_type: SourceType,
    #[serde_as(as = "Num")]
    pub charged_read_quota: u64,
    #[serde_as(as = "AddressHex")]
    pub payment_address: String,
    #[serde_as(as = "Num")]
    pub primary_sp_id: u32,
    #[serde_as(as = "Num")]
    pub global_virtual_group_family_id: u32,
    pub status: BucketStatus,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventDeleteBucket {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    #[serde_as(as = "AddressHex")]
    pub owner: String,
    pub bucket_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
    #[serde_as(as = "Num")]
    pub global_virtual_group_family_id: u32,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventUpdateBucketInfo {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
    #[serde_as(as = "Num")]
    pub charged_read_quota: u64,
    #[serde_as(as = "AddressHex")]
    pub payment_address: String,
    pub visibility: Visibility,
    #[serde_as(as = "Num")]
    pub global_virtual_group_family_id: u32,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventDiscontinueBucket {
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
    pub bucket_name: String,
    pub reason: String,
    /// Height at which the chain deletes the bucket.
    #[serde_as(as = "Num")]
    pub delete_at: i64,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventMigrationBucket {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
    #[serde_as(as = "Num")]
    pub dst_primary_sp_id: u32,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCompleteMigrationBucket {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
    #[serde_as(as = "Num")]
    pub global_virtual_group_family_id: u32,
    #[serde_as(as = "Num")]
    pub src_primary_sp_id: u32,
}

/// Shared by the cancel and reject migration events.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventEndMigrationBucket {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventToggleSPAsDelegatedAgent {
    pub bucket_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
    pub sp_as_delegated_agent_disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventBucketFlowRateLimitStatus {
    pub bucket_name: String,
    pub is_limited: bool,
}

// Objects

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCreateObject {
    #[serde_as(as = "AddressHex")]
    pub creator: String,
    #[serde_as(as = "AddressHex")]
    pub owner: String,
    pub bucket_name: String,
    pub object_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
    #[serde_as(as = "Uint256Hex")]
    pub object_id: String,
    #[serde_as(as = "Num")]
    pub primary_sp_id: u32,
    #[serde_as(as = "Num")]
    pub payload_size: u64,
    pub visibility: Visibility,
    pub content_type: String,
    /// Unix seconds.
    #[serde_as(as = "Num")]
    pub create_at: i64,
    pub status: ObjectStatus,
    pub redundancy_type: RedundancyType,
    pub source_type: SourceType,
    #[serde_as(as = "Vec<Base64Bytes>")]
    pub checksums: Vec<Vec<u8>>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventSealObject {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    pub object_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub object_id: String,
    pub status: ObjectStatus,
    #[serde_as(as = "Num")]
    pub global_virtual_group_id: u32,
    #[serde_as(as = "Num")]
    pub local_virtual_group_id: u32,
    /// Empty on chains that only report checksums at creation.
    #[serde_as(as = "Vec<Base64Bytes>")]
    pub checksums: Vec<Vec<u8>>,
}

/// Shared by the events that only name an object: cancel create and
/// cancel content update.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventObjectRef {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    pub object_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub object_id: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCopyObject {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub src_bucket_name: String,
    pub src_object_name: String,
    pub dst_bucket_name: String,
    pub dst_object_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub src_object_id: String,
    #[serde_as(as = "Uint256Hex")]
    pub dst_object_id: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventDeleteObject {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    pub object_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub object_id: String,
    #[serde_as(as = "Num")]
    pub local_virtual_group_id: u32,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventRejectSealObject {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    pub object_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub object_id: String,
    /// The rejected seal was the one of a content update; the previous
    /// content stays live.
    pub for_update: bool,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventDiscontinueObject {
    pub bucket_name: String,
    #[serde_as(as = "Vec<Uint256Hex>")]
    pub object_ids: Vec<String>,
    pub reason: String,
    #[serde_as(as = "Num")]
    pub delete_at: i64,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventUpdateObjectInfo {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    pub object_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub object_id: String,
    pub visibility: Visibility,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventUpdateObjectContent {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    pub object_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub object_id: String,
    #[serde_as(as = "Num")]
    pub payload_size: u64,
    pub content_type: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventUpdateObjectContentSuccess {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    pub bucket_name: String,
    pub object_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub object_id: String,
    pub content_type: String,
    #[serde_as(as = "Num")]
    pub prev_payload_size: u64,
    #[serde_as(as = "Num")]
    pub new_payload_size: u64,
    #[serde_as(as = "Vec<Base64Bytes>")]
    pub new_checksums: Vec<Vec<u8>>,
    #[serde_as(as = "Num")]
    pub version: i64,
    /// Unix seconds.
    #[serde_as(as = "Num")]
    pub updated_at: i64,
}

// Groups

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GroupMember {
    #[serde_as(as = "AddressHex")]
    pub member: String,
    /// Unix seconds, `None` when the membership never expires.
    #[serde_as(as = "Option<Timestamp>")]
    pub expiration_time: Option<i64>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCreateGroup {
    #[serde_as(as = "AddressHex")]
    pub owner: String,
    pub group_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub group_id: String,
    pub source_type: SourceType,
    pub extra: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventDeleteGroup {
    #[serde_as(as = "AddressHex")]
    pub owner: String,
    pub group_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub group_id: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventLeaveGroup {
    #[serde_as(as = "AddressHex")]
    pub member_address: String,
    #[serde_as(as = "AddressHex")]
    pub owner: String,
    pub group_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub group_id: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventUpdateGroupMember {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    #[serde_as(as = "AddressHex")]
    pub owner: String,
    pub group_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub group_id: String,
    pub members_to_add: Vec<GroupMember>,
    #[serde_as(as = "Vec<AddressHex>")]
    pub members_to_delete: Vec<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventRenewGroupMember {
    #[serde_as(as = "AddressHex")]
    pub operator: String,
    #[serde_as(as = "AddressHex")]
    pub owner: String,
    pub group_name: String,
    #[serde_as(as = "Uint256Hex")]
    pub group_id: String,
    pub members: Vec<GroupMember>,
}
