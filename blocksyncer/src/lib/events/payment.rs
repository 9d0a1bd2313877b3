// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use serde::Deserialize;
use serde_with::serde_as;

use super::codec::{chain_enum, AddressHex, DecimalText, Num};

chain_enum! {
    pub enum StreamAccountStatus : "STREAM_ACCOUNT_STATUS_" {
        #[default]
        Active = 0 => "ACTIVE",
        Frozen = 1 => "FROZEN",
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventPaymentAccountUpdate {
    #[serde_as(as = "AddressHex")]
    pub addr: String,
    #[serde_as(as = "AddressHex")]
    pub owner: String,
    pub refundable: bool,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventStreamRecordUpdate {
    #[serde_as(as = "AddressHex")]
    pub account: String,
    #[serde_as(as = "Num")]
    pub crud_timestamp: i64,
    #[serde_as(as = "DecimalText")]
    pub netflow_rate: String,
    #[serde_as(as = "DecimalText")]
    pub frozen_netflow_rate: String,
    #[serde_as(as = "DecimalText")]
    pub static_balance: String,
    #[serde_as(as = "DecimalText")]
    pub buffer_balance: String,
    #[serde_as(as = "DecimalText")]
    pub lock_balance: String,
    pub status: StreamAccountStatus,
    #[serde_as(as = "Num")]
    pub settle_timestamp: i64,
    #[serde_as(as = "Num")]
    pub out_flow_count: u64,
}
