// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Storage provider events, including the exit and swap-out flows of the
//! virtual group module.

use serde::Deserialize;
use serde_with::serde_as;

use super::codec::{
    chain_enum, AddressHex, Base64Bytes, Coin, DecimalText, Num,
};

chain_enum! {
    pub enum StorageProviderStatus : "STATUS_" {
        #[default]
        InService = 0 => "IN_SERVICE",
        InJailed = 1 => "IN_JAILED",
        GracefulExiting = 2 => "GRACEFUL_EXITING",
        InMaintenance = 3 => "IN_MAINTENANCE",
        ForcedExiting = 4 => "FORCED_EXITING",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Description {
    pub moniker: String,
    pub identity: String,
    pub website: String,
    pub security_contact: String,
    pub details: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCreateStorageProvider {
    #[serde_as(as = "Num")]
    pub sp_id: u32,
    #[serde_as(as = "AddressHex")]
    pub sp_address: String,
    #[serde_as(as = "AddressHex")]
    pub funding_address: String,
    #[serde_as(as = "AddressHex")]
    pub seal_address: String,
    #[serde_as(as = "AddressHex")]
    pub approval_address: String,
    #[serde_as(as = "AddressHex")]
    pub gc_address: String,
    pub total_deposit: Coin,
    pub status: StorageProviderStatus,
    pub endpoint: String,
    pub description: Description,
    #[serde_as(as = "Base64Bytes")]
    pub bls_key: Vec<u8>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventEditStorageProvider {
    #[serde_as(as = "Num")]
    pub sp_id: u32,
    #[serde_as(as = "AddressHex")]
    pub sp_address: String,
    pub endpoint: String,
    pub description: Description,
    #[serde_as(as = "AddressHex")]
    pub seal_address: String,
    #[serde_as(as = "AddressHex")]
    pub approval_address: String,
    #[serde_as(as = "AddressHex")]
    pub gc_address: String,
    #[serde_as(as = "Base64Bytes")]
    pub bls_key: Vec<u8>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventSpStoragePriceUpdate {
    #[serde_as(as = "Num")]
    pub sp_id: u32,
    #[serde_as(as = "Num")]
    pub update_time_sec: i64,
    #[serde_as(as = "DecimalText")]
    pub read_price: String,
    #[serde_as(as = "Num")]
    pub free_read_quota: u64,
    #[serde_as(as = "DecimalText")]
    pub store_price: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventStorageProviderExit {
    #[serde_as(as = "Num")]
    pub storage_provider_id: u32,
    #[serde_as(as = "AddressHex")]
    pub operator_address: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCompleteStorageProviderExit {
    #[serde_as(as = "Num")]
    pub storage_provider_id: u32,
    #[serde_as(as = "AddressHex")]
    pub operator_address: String,
    #[serde_as(as = "DecimalText")]
    pub total_deposit: String,
}

/// Shared by the swap-out and cancel swap-out events.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventSwapOut {
    #[serde_as(as = "Num")]
    pub storage_provider_id: u32,
    #[serde_as(as = "Num")]
    pub global_virtual_group_family_id: u32,
    #[serde_as(as = "Vec<Num>")]
    pub global_virtual_group_ids: Vec<u32>,
    #[serde_as(as = "Num")]
    pub successor_sp_id: u32,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCompleteSwapOut {
    #[serde_as(as = "Num")]
    pub storage_provider_id: u32,
    #[serde_as(as = "Num")]
    pub src_storage_provider_id: u32,
    #[serde_as(as = "Num")]
    pub global_virtual_group_family_id: u32,
    #[serde_as(as = "Vec<Num>")]
    pub global_virtual_group_ids: Vec<u32>,
}
