// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use async_trait::async_trait;
use bsdb::catalog::{TableDef, STORAGE_PROVIDERS};
use bsdb::{Filter, Lookup, Row, RowMutation};

use super::{created, decimal, touched};
use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::sp::Description;
use crate::events::*;
use crate::registry::{catalog_tables, Extract, Handler, Module};

const EVENTS: &[&str] = &[
    EVENT_CREATE_STORAGE_PROVIDER,
    EVENT_EDIT_STORAGE_PROVIDER,
    EVENT_SP_STORAGE_PRICE_UPDATE,
    EVENT_COMPLETE_STORAGE_PROVIDER_EXIT,
];

/// Columns an edit may overwrite.
const EDIT_COLUMNS: &[&str] = &[
    "operator_address",
    "seal_address",
    "approval_address",
    "gc_address",
    "bls_key",
    "endpoint",
    "moniker",
    "identity",
    "website",
    "security_contact",
    "details",
    "removed",
    "update_at",
    "update_tx_hash",
    "update_time",
];

pub struct StorageProviderModule;

impl Module for StorageProviderModule {
    fn name(&self) -> &'static str {
        "storage_provider"
    }

    fn interested_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
        catalog_tables(&[STORAGE_PROVIDERS])
    }

    fn handler(&self) -> Handler<'_> {
        Handler::Extract(self)
    }
}

fn by_id(sp_id: u32) -> Filter {
    Filter::new().eq("sp_id", sp_id)
}

fn described(row: Row, d: &Description) -> Row {
    row.with("moniker", &d.moniker)
        .with("identity", &d.identity)
        .with("website", &d.website)
        .with("security_contact", &d.security_contact)
        .with("details", &d.details)
}

#[async_trait]
impl Extract for StorageProviderModule {
    async fn extract(
        &self,
        ctx: &BlockContext,
        _lookup: &mut dyn Lookup,
        event: &Event,
    ) -> Result<Vec<RowMutation>, SyncError> {
        let mutation = match event {
            Event::CreateStorageProvider(e) => {
                let row = Row::new()
                    .with("sp_id", e.sp_id)
                    .with("operator_address", &e.sp_address)
                    .with("funding_address", &e.funding_address)
                    .with("seal_address", &e.seal_address)
                    .with("approval_address", &e.approval_address)
                    .with("gc_address", &e.gc_address)
                    .with("bls_key", hex::encode(&e.bls_key))
                    .with("total_deposit", decimal(&e.total_deposit.amount))
                    .with("status", e.status.as_str())
                    .with("endpoint", &e.endpoint)
                    .with("removed", false);
                RowMutation::upsert(
                    STORAGE_PROVIDERS,
                    &["sp_id"],
                    created(ctx, described(row, &e.description)),
                )
            }
            Event::EditStorageProvider(e) => {
                let row = Row::new()
                    .with("sp_id", e.sp_id)
                    .with("operator_address", &e.sp_address)
                    .with("seal_address", &e.seal_address)
                    .with("approval_address", &e.approval_address)
                    .with("gc_address", &e.gc_address)
                    .with("bls_key", hex::encode(&e.bls_key))
                    .with("endpoint", &e.endpoint)
                    .with("removed", false);
                RowMutation::upsert_columns(
                    STORAGE_PROVIDERS,
                    &["sp_id"],
                    touched(ctx, described(row, &e.description)),
                    EDIT_COLUMNS,
                )
            }
            Event::SpStoragePriceUpdate(e) => RowMutation::update_where(
                STORAGE_PROVIDERS,
                by_id(e.sp_id),
                touched(
                    ctx,
                    Row::new()
                        .with("read_price", decimal(&e.read_price))
                        .with("free_read_quota", e.free_read_quota)
                        .with("store_price", decimal(&e.store_price))
                        .with("price_update_time", e.update_time_sec),
                ),
            ),
            Event::CompleteStorageProviderExit(e) => RowMutation::update_where(
                STORAGE_PROVIDERS,
                by_id(e.storage_provider_id),
                touched(ctx, Row::new().with("removed", true)),
            ),
            _ => return Ok(vec![]),
        };
        Ok(vec![mutation])
    }
}

#[cfg(test)]
mod tests {
    use bsdb::models::{FromRow, StorageProvider};

    use super::*;
    use crate::chain::AbciEvent;
    use crate::modules::testing::*;

    fn address(n: u8) -> String {
        format!("0x{}", hex::encode([n; 20]))
    }

    fn create_sp() -> AbciEvent {
        AbciEvent::new(EVENT_CREATE_STORAGE_PROVIDER)
            .attr("sp_id", "7")
            .attr("sp_address", quoted(address(1)))
            .attr("funding_address", quoted(address(2)))
            .attr("seal_address", quoted(address(3)))
            .attr("approval_address", quoted(address(4)))
            .attr("gc_address", quoted(address(5)))
            .attr("total_deposit", r#"{"denom":"BNB","amount":"1000"}"#)
            .attr("status", quoted("STATUS_IN_SERVICE"))
            .attr("endpoint", quoted("https://sp.example"))
            .attr("description", r#"{"moniker":"sp7","website":"w"}"#)
            .attr("bls_key", quoted("AQI="))
    }

    fn provider(store: &bsdb::MemoryStore) -> StorageProvider {
        let rows = store.rows(STORAGE_PROVIDERS);
        assert_eq!(rows.len(), 1);
        StorageProvider::from_row(&rows[0]).unwrap()
    }

    #[tokio::test]
    async fn test_create_edit_and_price() {
        let (dispatcher, store) = setup().await;
        let edit = AbciEvent::new(EVENT_EDIT_STORAGE_PROVIDER)
            .attr("sp_id", "7")
            .attr("sp_address", quoted(address(1)))
            .attr("seal_address", quoted(address(9)))
            .attr("endpoint", quoted("https://sp2.example"))
            .attr("description", r#"{"moniker":"renamed"}"#)
            .attr("bls_key", quoted("AwQ="));
        let price = AbciEvent::new(EVENT_SP_STORAGE_PRICE_UPDATE)
            .attr("sp_id", "7")
            .attr("update_time_sec", "1700000100")
            .attr("read_price", quoted("0.087"))
            .attr("free_read_quota", "1024")
            .attr("store_price", quoted("0.0048"));
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![vec![create_sp()], vec![edit], vec![price]],
        )
        .await;

        let sp = provider(&store);
        assert_eq!(sp.sp_id, 7);
        assert_eq!(sp.operator_address, address(1));
        assert_eq!(sp.funding_address, address(2));
        assert_eq!(sp.seal_address, address(9));
        assert_eq!(sp.bls_key, "0304");
        assert_eq!(sp.total_deposit, "1000");
        assert_eq!(sp.status, "IN_SERVICE");
        assert_eq!(sp.endpoint, "https://sp2.example");
        assert_eq!(sp.moniker, "renamed");
        assert_eq!(sp.website, "");
        assert_eq!(sp.read_price, "0.087");
        assert_eq!(sp.free_read_quota, 1024);
        assert_eq!(sp.store_price, "0.0048");
        assert_eq!(sp.price_update_time, 1_700_000_100);
        assert!(!sp.removed);
    }

    #[tokio::test]
    async fn test_complete_exit_flags_provider() {
        let (dispatcher, store) = setup().await;
        let exit = AbciEvent::new(EVENT_COMPLETE_STORAGE_PROVIDER_EXIT)
            .attr("storage_provider_id", "7")
            .attr("operator_address", quoted(address(1)))
            .attr("total_deposit", quoted("1000"));
        run_blocks(&dispatcher, &store, 1, vec![vec![create_sp()], vec![exit]])
            .await;
        assert!(provider(&store).removed);
    }
}
