// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Global virtual groups, their families and the local virtual groups that
//! bind a bucket to them. Deleted groups are kept with `removed` set.

use async_trait::async_trait;
use bsdb::catalog::{
    TableDef, GLOBAL_VIRTUAL_GROUP, GLOBAL_VIRTUAL_GROUP_FAMILIES,
    LOCAL_VIRTUAL_GROUP,
};
use bsdb::value::join_u32_csv;
use bsdb::{Filter, Lookup, Row, RowMutation};

use super::{created, decimal, touched};
use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::*;
use crate::registry::{catalog_tables, Extract, Handler, Module};

const EVENTS: &[&str] = &[
    EVENT_CREATE_LOCAL_VIRTUAL_GROUP,
    EVENT_UPDATE_LOCAL_VIRTUAL_GROUP,
    EVENT_DELETE_LOCAL_VIRTUAL_GROUP,
    EVENT_CREATE_GLOBAL_VIRTUAL_GROUP,
    EVENT_UPDATE_GLOBAL_VIRTUAL_GROUP,
    EVENT_DELETE_GLOBAL_VIRTUAL_GROUP,
    EVENT_CREATE_GLOBAL_VIRTUAL_GROUP_FAMILY,
    EVENT_UPDATE_GLOBAL_VIRTUAL_GROUP_FAMILY,
    EVENT_DELETE_GLOBAL_VIRTUAL_GROUP_FAMILY,
];

const LVG_KEYS: &[&str] = &["local_virtual_group_id", "bucket_id"];
const GVG_ID: &str = "global_virtual_group_id";
const FAMILY_ID: &str = "global_virtual_group_family_id";

pub struct VirtualGroupModule;

impl Module for VirtualGroupModule {
    fn name(&self) -> &'static str {
        "virtual_group"
    }

    fn interested_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
        catalog_tables(&[
            GLOBAL_VIRTUAL_GROUP,
            LOCAL_VIRTUAL_GROUP,
            GLOBAL_VIRTUAL_GROUP_FAMILIES,
        ])
    }

    fn handler(&self) -> Handler<'_> {
        Handler::Extract(self)
    }
}

fn lvg(id: u32, bucket_id: &str) -> Filter {
    Filter::new()
        .eq("local_virtual_group_id", id)
        .eq("bucket_id", bucket_id)
}

fn set(
    ctx: &BlockContext,
    table: &str,
    filter: Filter,
    row: Row,
) -> RowMutation {
    RowMutation::update_where(table, filter, touched(ctx, row))
}

fn remove(ctx: &BlockContext, table: &str, filter: Filter) -> RowMutation {
    set(ctx, table, filter, Row::new().with("removed", true))
}

#[async_trait]
impl Extract for VirtualGroupModule {
    async fn extract(
        &self,
        ctx: &BlockContext,
        _lookup: &mut dyn Lookup,
        event: &Event,
    ) -> Result<Vec<RowMutation>, SyncError> {
        let mutation = match event {
            Event::CreateLocalVirtualGroup(e) => RowMutation::upsert(
                LOCAL_VIRTUAL_GROUP,
                LVG_KEYS,
                created(
                    ctx,
                    Row::new()
                        .with("local_virtual_group_id", e.id)
                        .with("bucket_id", &e.bucket_id)
                        .with(GVG_ID, e.global_virtual_group_id)
                        .with("stored_size", e.stored_size)
                        .with("removed", false),
                ),
            ),
            Event::UpdateLocalVirtualGroup(e) => set(
                ctx,
                LOCAL_VIRTUAL_GROUP,
                lvg(e.id, &e.bucket_id),
                Row::new()
                    .with(GVG_ID, e.global_virtual_group_id)
                    .with("stored_size", e.stored_size),
            ),
            Event::DeleteLocalVirtualGroup(e) => {
                remove(ctx, LOCAL_VIRTUAL_GROUP, lvg(e.id, &e.bucket_id))
            }
            Event::CreateGlobalVirtualGroup(e) => RowMutation::upsert(
                GLOBAL_VIRTUAL_GROUP,
                &[GVG_ID],
                created(
                    ctx,
                    Row::new()
                        .with(GVG_ID, e.id)
                        .with("family_id", e.family_id)
                        .with("primary_sp_id", e.primary_sp_id)
                        .with(
                            "secondary_sp_ids",
                            join_u32_csv(&e.secondary_sp_ids),
                        )
                        .with("stored_size", e.stored_size)
                        .with(
                            "virtual_payment_address",
                            &e.virtual_payment_address,
                        )
                        .with("total_deposit", decimal(&e.total_deposit))
                        .with("removed", false),
                ),
            ),
            Event::UpdateGlobalVirtualGroup(e) => set(
                ctx,
                GLOBAL_VIRTUAL_GROUP,
                Filter::new().eq(GVG_ID, e.id),
                Row::new()
                    .with("primary_sp_id", e.primary_sp_id)
                    .with(
                        "secondary_sp_ids",
                        join_u32_csv(&e.secondary_sp_ids),
                    )
                    .with("stored_size", e.store_size)
                    .with("total_deposit", decimal(&e.total_deposit)),
            ),
            Event::DeleteGlobalVirtualGroup(e) => remove(
                ctx,
                GLOBAL_VIRTUAL_GROUP,
                Filter::new().eq(GVG_ID, e.id),
            ),
            Event::CreateGlobalVirtualGroupFamily(e) => RowMutation::upsert(
                GLOBAL_VIRTUAL_GROUP_FAMILIES,
                &[FAMILY_ID],
                created(
                    ctx,
                    Row::new()
                        .with(FAMILY_ID, e.id)
                        .with("primary_sp_id", e.primary_sp_id)
                        .with(
                            "global_virtual_group_ids",
                            join_u32_csv(&e.global_virtual_group_ids),
                        )
                        .with(
                            "virtual_payment_address",
                            &e.virtual_payment_address,
                        )
                        .with("removed", false),
                ),
            ),
            Event::UpdateGlobalVirtualGroupFamily(e) => set(
                ctx,
                GLOBAL_VIRTUAL_GROUP_FAMILIES,
                Filter::new().eq(FAMILY_ID, e.id),
                Row::new().with("primary_sp_id", e.primary_sp_id).with(
                    "global_virtual_group_ids",
                    join_u32_csv(&e.global_virtual_group_ids),
                ),
            ),
            Event::DeleteGlobalVirtualGroupFamily(e) => remove(
                ctx,
                GLOBAL_VIRTUAL_GROUP_FAMILIES,
                Filter::new().eq(FAMILY_ID, e.id),
            ),
            _ => return Ok(vec![]),
        };
        Ok(vec![mutation])
    }
}

#[cfg(test)]
mod tests {
    use bsdb::models::{
        FromRow, GlobalVirtualGroup, GlobalVirtualGroupFamily,
        LocalVirtualGroup,
    };

    use super::*;
    use crate::chain::AbciEvent;
    use crate::modules::testing::*;

    #[tokio::test]
    async fn test_global_virtual_group_lifecycle() {
        let (dispatcher, store) = setup().await;
        let create = AbciEvent::new(EVENT_CREATE_GLOBAL_VIRTUAL_GROUP)
            .attr("id", "4")
            .attr("family_id", "2")
            .attr("primary_sp_id", "1")
            .attr("secondary_sp_ids", "[2,3,\"4\"]")
            .attr("stored_size", "100")
            .attr("virtual_payment_address", quoted(OWNER))
            .attr("total_deposit", quoted("5000"));
        let update = AbciEvent::new(EVENT_UPDATE_GLOBAL_VIRTUAL_GROUP)
            .attr("id", "4")
            .attr("store_size", "300")
            .attr("total_deposit", quoted("6000"))
            .attr("primary_sp_id", "5")
            .attr("secondary_sp_ids", "[2,3,6]");
        run_blocks(&dispatcher, &store, 1, vec![vec![create], vec![update]])
            .await;

        let gvg =
            GlobalVirtualGroup::from_row(&store.rows(GLOBAL_VIRTUAL_GROUP)[0])
                .unwrap();
        assert_eq!(gvg.family_id, 2);
        assert_eq!(gvg.primary_sp_id, 5);
        assert_eq!(gvg.secondary_sp_ids, vec![2, 3, 6]);
        assert_eq!(gvg.stored_size, 300);
        assert_eq!(gvg.total_deposit, "6000");
        assert_eq!(gvg.virtual_payment_address, OWNER);

        let delete = AbciEvent::new(EVENT_DELETE_GLOBAL_VIRTUAL_GROUP)
            .attr("id", "4");
        run_blocks(&dispatcher, &store, 3, vec![vec![delete]]).await;
        let rows = store.rows(GLOBAL_VIRTUAL_GROUP);
        assert_eq!(rows.len(), 1);
        assert!(GlobalVirtualGroup::from_row(&rows[0]).unwrap().removed);
    }

    #[tokio::test]
    async fn test_local_virtual_group_per_bucket() {
        let (dispatcher, store) = setup().await;
        let create = |bucket: u64| {
            AbciEvent::new(EVENT_CREATE_LOCAL_VIRTUAL_GROUP)
                .attr("id", "1")
                .attr("global_virtual_group_id", "4")
                .attr("bucket_id", quoted(bucket))
                .attr("stored_size", "0")
        };
        let update = AbciEvent::new(EVENT_UPDATE_LOCAL_VIRTUAL_GROUP)
            .attr("id", "1")
            .attr("global_virtual_group_id", "8")
            .attr("bucket_id", quoted(2))
            .attr("stored_size", "42");
        let delete = AbciEvent::new(EVENT_DELETE_LOCAL_VIRTUAL_GROUP)
            .attr("id", "1")
            .attr("bucket_id", quoted(1));
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![vec![create(1), create(2)], vec![update, delete]],
        )
        .await;

        let mut groups: Vec<_> = store
            .rows(LOCAL_VIRTUAL_GROUP)
            .iter()
            .map(|r| LocalVirtualGroup::from_row(r).unwrap())
            .collect();
        groups.sort_by(|a, b| a.bucket_id.cmp(&b.bucket_id));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].bucket_id, hex_id(1));
        assert!(groups[0].removed);
        assert_eq!(groups[0].global_virtual_group_id, 4);
        assert!(!groups[1].removed);
        assert_eq!(groups[1].global_virtual_group_id, 8);
        assert_eq!(groups[1].stored_size, 42);
    }

    #[tokio::test]
    async fn test_family_update_keeps_payment_address() {
        let (dispatcher, store) = setup().await;
        let create = AbciEvent::new(EVENT_CREATE_GLOBAL_VIRTUAL_GROUP_FAMILY)
            .attr("id", "2")
            .attr("primary_sp_id", "1")
            .attr("virtual_payment_address", quoted(OWNER))
            .attr("global_virtual_group_ids", "[4]");
        let update = AbciEvent::new(EVENT_UPDATE_GLOBAL_VIRTUAL_GROUP_FAMILY)
            .attr("id", "2")
            .attr("primary_sp_id", "3")
            .attr("global_virtual_group_ids", "[4,9]");
        run_blocks(&dispatcher, &store, 1, vec![vec![create, update]]).await;

        let family = GlobalVirtualGroupFamily::from_row(
            &store.rows(GLOBAL_VIRTUAL_GROUP_FAMILIES)[0],
        )
        .unwrap();
        assert_eq!(family.primary_sp_id, 3);
        assert_eq!(family.global_virtual_group_ids, vec![4, 9]);
        assert_eq!(family.virtual_payment_address, OWNER);
        assert!(!family.removed);
    }
}
