// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use async_trait::async_trait;
use bsdb::catalog::{TableDef, PAYMENT_ACCOUNTS, STREAM_RECORDS};
use bsdb::{Lookup, Row, RowMutation};

use super::decimal;
use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::*;
use crate::registry::{catalog_tables, Extract, Handler, Module};

const EVENTS: &[&str] =
    &[EVENT_PAYMENT_ACCOUNT_UPDATE, EVENT_STREAM_RECORD_UPDATE];

pub struct PaymentModule;

impl Module for PaymentModule {
    fn name(&self) -> &'static str {
        "payment"
    }

    fn interested_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
        catalog_tables(&[PAYMENT_ACCOUNTS, STREAM_RECORDS])
    }

    fn handler(&self) -> Handler<'_> {
        Handler::Extract(self)
    }
}

#[async_trait]
impl Extract for PaymentModule {
    async fn extract(
        &self,
        ctx: &BlockContext,
        _lookup: &mut dyn Lookup,
        event: &Event,
    ) -> Result<Vec<RowMutation>, SyncError> {
        let mutation = match event {
            Event::PaymentAccountUpdate(e) => RowMutation::upsert(
                PAYMENT_ACCOUNTS,
                &["addr"],
                Row::new()
                    .with("addr", &e.addr)
                    .with("owner", &e.owner)
                    .with("refundable", e.refundable)
                    .with("update_at", ctx.height)
                    .with("update_time", ctx.block_time),
            ),
            Event::StreamRecordUpdate(e) => RowMutation::upsert(
                STREAM_RECORDS,
                &["account"],
                Row::new()
                    .with("account", &e.account)
                    .with("crud_timestamp", e.crud_timestamp)
                    .with("netflow_rate", decimal(&e.netflow_rate))
                    .with("frozen_netflow_rate", decimal(&e.frozen_netflow_rate))
                    .with("static_balance", decimal(&e.static_balance))
                    .with("buffer_balance", decimal(&e.buffer_balance))
                    .with("lock_balance", decimal(&e.lock_balance))
                    .with("status", e.status.as_str())
                    .with("settle_timestamp", e.settle_timestamp)
                    .with("out_flow_count", e.out_flow_count)
                    .with("update_at", ctx.height)
                    .with("update_time", ctx.block_time),
            ),
            _ => return Ok(vec![]),
        };
        Ok(vec![mutation])
    }
}
