// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use serde::Deserialize;
use serde_with::serde_as;

use super::codec::{AddressHex, DecimalText, Num, Uint256Hex};

/// Create and update of a local virtual group carry the same fields.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventLocalVirtualGroup {
    #[serde_as(as = "Num")]
    pub id: u32,
    #[serde_as(as = "Num")]
    pub global_virtual_group_id: u32,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
    #[serde_as(as = "Num")]
    pub stored_size: u64,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventDeleteLocalVirtualGroup {
    #[serde_as(as = "Num")]
    pub id: u32,
    #[serde_as(as = "Uint256Hex")]
    pub bucket_id: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCreateGlobalVirtualGroup {
    #[serde_as(as = "Num")]
    pub id: u32,
    #[serde_as(as = "Num")]
    pub family_id: u32,
    #[serde_as(as = "Num")]
    pub primary_sp_id: u32,
    #[serde_as(as = "Vec<Num>")]
    pub secondary_sp_ids: Vec<u32>,
    #[serde_as(as = "Num")]
    pub stored_size: u64,
    #[serde_as(as = "AddressHex")]
    pub virtual_payment_address: String,
    #[serde_as(as = "DecimalText")]
    pub total_deposit: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventUpdateGlobalVirtualGroup {
    #[serde_as(as = "Num")]
    pub id: u32,
    #[serde_as(as = "Num")]
    pub store_size: u64,
    #[serde_as(as = "DecimalText")]
    pub total_deposit: String,
    #[serde_as(as = "Num")]
    pub primary_sp_id: u32,
    #[serde_as(as = "Vec<Num>")]
    pub secondary_sp_ids: Vec<u32>,
}

/// Deletion of a global virtual group or of a family.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventDeleteById {
    #[serde_as(as = "Num")]
    pub id: u32,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventCreateGlobalVirtualGroupFamily {
    #[serde_as(as = "Num")]
    pub id: u32,
    #[serde_as(as = "Num")]
    pub primary_sp_id: u32,
    #[serde_as(as = "AddressHex")]
    pub virtual_payment_address: String,
    #[serde_as(as = "Vec<Num>")]
    pub global_virtual_group_ids: Vec<u32>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventUpdateGlobalVirtualGroupFamily {
    #[serde_as(as = "Num")]
    pub id: u32,
    #[serde_as(as = "Num")]
    pub primary_sp_id: u32,
    #[serde_as(as = "Vec<Num>")]
    pub global_virtual_group_ids: Vec<u32>,
}
