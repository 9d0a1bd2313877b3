// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use serde::Deserialize;
use serde_with::serde_as;

use super::codec::{chain_enum, Timestamp, UInt64Value, Uint256Hex};

chain_enum! {
    pub enum PrincipalType : "PRINCIPAL_TYPE_GNFD_" {
        #[default]
        Unspecified = 0 => "UNSPECIFIED",
        Account = 1 => "ACCOUNT",
        Group = 2 => "GROUP",
    }
}

chain_enum! {
    pub enum ResourceType : "RESOURCE_TYPE_" {
        #[default]
        Unspecified = 0 => "UNSPECIFIED",
        Bucket = 1 => "BUCKET",
        Object = 2 => "OBJECT",
        Group = 3 => "GROUP",
    }
}

chain_enum! {
    pub enum Effect : "EFFECT_" {
        #[default]
        Unspecified = 0 => "UNSPECIFIED",
        Allow = 1 => "ALLOW",
        Deny = 2 => "DENY",
    }
}

chain_enum! {
    pub enum ActionType : "ACTION_" {
        #[default]
        Unspecified = 0 => "UNSPECIFIED",
        UpdateBucketInfo = 1 => "UPDATE_BUCKET_INFO",
        DeleteBucket = 2 => "DELETE_BUCKET",
        CreateObject = 3 => "CREATE_OBJECT",
        DeleteObject = 4 => "DELETE_OBJECT",
        CopyObject = 5 => "COPY_OBJECT",
        GetObject = 6 => "GET_OBJECT",
        ExecuteObject = 7 => "EXECUTE_OBJECT",
        ListObject = 8 => "LIST_OBJECT",
        UpdateGroupMember = 9 => "UPDATE_GROUP_MEMBER",
        DeleteGroup = 10 => "DELETE_GROUP",
        UpdateObjectInfo = 11 => "UPDATE_OBJECT_INFO",
        UpdateGroupInfo = 12 => "UPDATE_GROUP_INFO",
        UpdateGroupExtra = 13 => "UPDATE_GROUP_EXTRA",
        UpdatePayment = 14 => "UPDATE_PAYMENT",
        All = 99 => "TYPE_ALL",
    }
}

impl ActionType {
    /// Bit of the action in a statement's action bitmap, `None` for the
    /// unspecified action.
    pub fn bit(&self) -> Option<u32> {
        match self {
            ActionType::Unspecified => None,
            ActionType::All => Some(0),
            other => u32::try_from(other.number()).ok(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Principal {
    #[serde(rename = "type")]
    pub kind: PrincipalType,
    /// An account address or a group id, as the chain spells it.
    pub value: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Statement {
    pub effect: Effect,
    pub actions: Vec<ActionType>,
    pub resources: Vec<String>,
    #[serde_as(as = "Option<Timestamp>")]
    pub expiration_time: Option<i64>,
    pub limit_size: Option<UInt64Value>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventPutPolicy {
    pub principal: Principal,
    pub resource_type: ResourceType,
    #[serde_as(as = "Uint256Hex")]
    pub resource_id: String,
    pub statements: Vec<Statement>,
    #[serde_as(as = "Uint256Hex")]
    pub policy_id: String,
    #[serde_as(as = "Option<Timestamp>")]
    pub expiration_time: Option<i64>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventDeletePolicy {
    #[serde_as(as = "Uint256Hex")]
    pub policy_id: String,
}
