// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Groups and their memberships.
//!
//! A group is stored as one row per member plus a sentinel row whose
//! account is the zero address; the sentinel carries the group itself.

use async_trait::async_trait;
use bsdb::catalog::{TableDef, GROUPS};
use bsdb::value::ZERO_ADDRESS;
use bsdb::{Filter, Lookup, Row, RowMutation};

use super::{created, touched};
use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::storage::GroupMember;
use crate::events::*;
use crate::registry::{catalog_tables, Extract, Handler, Module};

const EVENTS: &[&str] = &[
    EVENT_CREATE_GROUP,
    EVENT_DELETE_GROUP,
    EVENT_LEAVE_GROUP,
    EVENT_UPDATE_GROUP_MEMBER,
    EVENT_RENEW_GROUP_MEMBER,
];

const KEYS: &[&str] = &["group_id", "account_id"];

pub struct GroupModule;

impl Module for GroupModule {
    fn name(&self) -> &'static str {
        "group"
    }

    fn interested_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
        catalog_tables(&[GROUPS])
    }

    fn handler(&self) -> Handler<'_> {
        Handler::Extract(self)
    }
}

fn member(group_id: &str, account: &str) -> Filter {
    Filter::new().eq("group_id", group_id).eq("account_id", account)
}

/// Touch the sentinel row of a group whose membership changed.
fn touch_group(ctx: &BlockContext, group_id: &str, operator: &str) -> RowMutation {
    RowMutation::update_where(
        GROUPS,
        member(group_id, ZERO_ADDRESS),
        touched(ctx, Row::new().with("operator", operator)),
    )
}

fn member_row(
    ctx: &BlockContext,
    group_id: &str,
    group_name: &str,
    owner: &str,
    operator: &str,
    m: &GroupMember,
) -> Row {
    created(
        ctx,
        Row::new()
            .with("group_id", group_id)
            .with("account_id", &m.member)
            .with("group_name", group_name)
            .with("owner", owner)
            .with("operator", operator)
            .with("expiration_time", m.expiration_time.unwrap_or_default())
            .with("removed", false),
    )
}

#[async_trait]
impl Extract for GroupModule {
    async fn extract(
        &self,
        ctx: &BlockContext,
        _lookup: &mut dyn Lookup,
        event: &Event,
    ) -> Result<Vec<RowMutation>, SyncError> {
        let mutations = match event {
            Event::CreateGroup(e) => vec![RowMutation::upsert(
                GROUPS,
                KEYS,
                created(
                    ctx,
                    Row::new()
                        .with("group_id", &e.group_id)
                        .with("account_id", ZERO_ADDRESS)
                        .with("group_name", &e.group_name)
                        .with("owner", &e.owner)
                        .with("operator", &e.owner)
                        .with("source_type", e.source_type.as_str())
                        .with("extra", &e.extra)
                        .with("expiration_time", 0i64)
                        .with("removed", false),
                ),
            )],
            Event::DeleteGroup(e) => vec![RowMutation::update_where(
                GROUPS,
                Filter::new().eq("group_id", &e.group_id),
                touched(
                    ctx,
                    Row::new().with("operator", &e.owner).with("removed", true),
                ),
            )],
            Event::LeaveGroup(e) => vec![
                RowMutation::update_where(
                    GROUPS,
                    member(&e.group_id, &e.member_address),
                    touched(
                        ctx,
                        Row::new()
                            .with("operator", &e.member_address)
                            .with("removed", true),
                    ),
                ),
                touch_group(ctx, &e.group_id, &e.member_address),
            ],
            Event::UpdateGroupMember(e) => {
                let mut mutations = vec![];
                if !e.members_to_add.is_empty() {
                    let rows = e
                        .members_to_add
                        .iter()
                        .map(|m| {
                            member_row(
                                ctx,
                                &e.group_id,
                                &e.group_name,
                                &e.owner,
                                &e.operator,
                                m,
                            )
                        })
                        .collect();
                    mutations.push(RowMutation::batch_insert(GROUPS, KEYS, rows));
                }
                if !e.members_to_delete.is_empty() {
                    mutations.push(RowMutation::update_where(
                        GROUPS,
                        Filter::new()
                            .eq("group_id", &e.group_id)
                            .is_in("account_id", &e.members_to_delete),
                        touched(
                            ctx,
                            Row::new()
                                .with("operator", &e.operator)
                                .with("removed", true),
                        ),
                    ));
                }
                mutations.push(touch_group(ctx, &e.group_id, &e.operator));
                mutations
            }
            Event::RenewGroupMember(e) => {
                let mut mutations: Vec<_> = e
                    .members
                    .iter()
                    .map(|m| {
                        RowMutation::update_where(
                            GROUPS,
                            member(&e.group_id, &m.member),
                            touched(
                                ctx,
                                Row::new()
                                    .with("operator", &e.operator)
                                    .with(
                                        "expiration_time",
                                        m.expiration_time.unwrap_or_default(),
                                    ),
                            ),
                        )
                    })
                    .collect();
                mutations.push(touch_group(ctx, &e.group_id, &e.operator));
                mutations
            }
            _ => vec![],
        };
        Ok(mutations)
    }
}

#[cfg(test)]
mod tests {
    use bsdb::models::{FromRow, Group};
    use bsdb::MemoryStore;

    use super::*;
    use crate::chain::AbciEvent;
    use crate::modules::testing::*;

    fn account(n: u8) -> String {
        format!("0x{}", hex::encode([n; 20]))
    }

    fn groups(store: &MemoryStore) -> Vec<Group> {
        let mut groups: Vec<Group> = store
            .rows(GROUPS)
            .iter()
            .map(|r| Group::from_row(r).unwrap())
            .collect();
        groups.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        groups
    }

    fn group_event(kind: &str) -> AbciEvent {
        AbciEvent::new(&format!("greenfield.storage.{kind}"))
            .attr("group_id", quoted(2))
            .attr("group_name", quoted("g"))
            .attr("owner", quoted(OWNER))
            .attr("operator", quoted(OWNER))
    }

    fn add_members() -> AbciEvent {
        let members: Vec<_> = (1..=3)
            .map(|n| {
                serde_json::json!({
                    "member": account(n),
                    "expiration_time": "2030-01-01T00:00:00Z",
                })
            })
            .collect();
        group_event("EventUpdateGroupMember").attr(
            "members_to_add",
            serde_json::Value::Array(members).to_string(),
        )
    }

    #[tokio::test]
    async fn test_batch_leave_touches_only_listed_members() {
        let (dispatcher, store) = setup().await;
        let leave = group_event("EventUpdateGroupMember").attr(
            "members_to_delete",
            serde_json::json!([account(1), account(3)]).to_string(),
        );
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![
                vec![group_event("EventCreateGroup"), add_members()],
                vec![leave],
            ],
        )
        .await;

        let groups = groups(&store);
        assert_eq!(groups.len(), 4);
        let by_account =
            |a: &str| groups.iter().find(|g| g.account_id == a).unwrap();
        assert!(by_account(&account(1)).removed);
        assert!(!by_account(&account(2)).removed);
        assert_eq!(by_account(&account(2)).tracking.update_at, 1);
        assert!(by_account(&account(3)).removed);
        assert_eq!(by_account(&account(3)).tracking.update_at, 2);
        let sentinel = by_account(ZERO_ADDRESS);
        assert!(!sentinel.removed);
        assert_eq!(sentinel.tracking.update_at, 2);
        assert_eq!(
            by_account(&account(2)).expiration_time,
            1_893_456_000
        );
    }

    #[tokio::test]
    async fn test_delete_and_leave() {
        let (dispatcher, store) = setup().await;
        let leave = group_event("EventLeaveGroup")
            .attr("member_address", quoted(account(2)));
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![
                vec![group_event("EventCreateGroup"), add_members()],
                vec![leave],
            ],
        )
        .await;
        let left: Vec<_> =
            groups(&store).into_iter().filter(|g| g.removed).collect();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].account_id, account(2));

        run_blocks(
            &dispatcher,
            &store,
            3,
            vec![vec![group_event("EventDeleteGroup")]],
        )
        .await;
        assert!(groups(&store).iter().all(|g| g.removed));
    }

    #[tokio::test]
    async fn test_renew_sets_expiration() {
        let (dispatcher, store) = setup().await;
        let renew = group_event("EventRenewGroupMember").attr(
            "members",
            serde_json::json!([{
                "member": account(1),
                "expiration_time": "2031-01-01T00:00:00Z",
            }])
            .to_string(),
        );
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![
                vec![group_event("EventCreateGroup"), add_members()],
                vec![renew],
            ],
        )
        .await;
        let groups = groups(&store);
        let renewed =
            groups.iter().find(|g| g.account_id == account(1)).unwrap();
        assert_eq!(renewed.expiration_time, 1_924_992_000);
    }
}
