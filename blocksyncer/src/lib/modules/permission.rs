// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Policies: one permission row per (resource, principal) and the
//! statements of its current policy. Nothing is ever deleted, a removed
//! policy is only flagged.

use async_trait::async_trait;
use bsdb::catalog::{TableDef, PERMISSION, STATEMENTS};
use bsdb::value::join_strings;
use bsdb::{Filter, Lookup, Row, RowMutation};

use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::permission::{ActionType, EventPutPolicy, Statement};
use crate::events::*;
use crate::registry::{catalog_tables, Extract, Handler, Module};

const EVENTS: &[&str] = &[EVENT_PUT_POLICY, EVENT_DELETE_POLICY];

const PERMISSION_KEYS: &[&str] =
    &["resource_type", "resource_id", "principal_type", "principal_value"];

/// Columns a new policy on an existing (resource, principal) overwrites.
const PERMISSION_UPDATE: &[&str] =
    &["policy_id", "update_timestamp", "expiration_time", "removed"];

pub struct PermissionModule;

impl Module for PermissionModule {
    fn name(&self) -> &'static str {
        "permission"
    }

    fn interested_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
        catalog_tables(&[PERMISSION, STATEMENTS])
    }

    fn handler(&self) -> Handler<'_> {
        Handler::Extract(self)
    }
}

/// Bitmap of `actions`, each action setting the bit of its number.
pub fn action_value(actions: &[ActionType]) -> Result<i64, SyncError> {
    actions.iter().try_fold(0i64, |value, action| match action.bit() {
        Some(bit) => Ok(value | 1 << bit),
        None => Err(SyncError::HandlerInternal(format!(
            "unexpected action {}",
            action.as_str()
        ))),
    })
}

fn statement_row(
    policy_id: &str,
    index: usize,
    s: &Statement,
) -> Result<Row, SyncError> {
    Ok(Row::new()
        .with("policy_id", policy_id)
        .with("statement_index", index as i64)
        .with("effect", s.effect.as_str())
        .with("action_value", action_value(&s.actions)?)
        .with("resources", join_strings(&s.resources))
        .with("expiration_time", s.expiration_time.unwrap_or_default())
        .with(
            "limit_size",
            s.limit_size.as_ref().map(|l| l.value).unwrap_or_default(),
        )
        .with("removed", false))
}

fn tombstone(table: &str, policy_id: &str, set: Row) -> RowMutation {
    RowMutation::update_where(
        table,
        Filter::new().eq("policy_id", policy_id),
        set.with("removed", true),
    )
}

fn put_policy(
    ctx: &BlockContext,
    e: &EventPutPolicy,
) -> Result<Vec<RowMutation>, SyncError> {
    let statements = e
        .statements
        .iter()
        .enumerate()
        .map(|(i, s)| statement_row(&e.policy_id, i, s))
        .collect::<Result<Vec<_>, _>>()?;

    // Statements of a previous version of the policy stay flagged unless
    // the new version writes the same index again
    let mut mutations = vec![tombstone(STATEMENTS, &e.policy_id, Row::new())];
    if !statements.is_empty() {
        mutations.push(RowMutation::batch_insert(
            STATEMENTS,
            &["policy_id", "statement_index"],
            statements,
        ));
    }
    mutations.push(RowMutation::upsert_columns(
        PERMISSION,
        PERMISSION_KEYS,
        Row::new()
            .with("principal_type", e.principal.kind.number())
            .with("principal_value", &e.principal.value)
            .with("resource_type", e.resource_type.as_str())
            .with("resource_id", &e.resource_id)
            .with("policy_id", &e.policy_id)
            .with("create_timestamp", ctx.block_time)
            .with("update_timestamp", ctx.block_time)
            .with("expiration_time", e.expiration_time.unwrap_or_default())
            .with("removed", false),
        PERMISSION_UPDATE,
    ));
    Ok(mutations)
}

#[async_trait]
impl Extract for PermissionModule {
    async fn extract(
        &self,
        ctx: &BlockContext,
        _lookup: &mut dyn Lookup,
        event: &Event,
    ) -> Result<Vec<RowMutation>, SyncError> {
        match event {
            Event::PutPolicy(e) => put_policy(ctx, e),
            Event::DeletePolicy(e) => Ok(vec![
                tombstone(
                    PERMISSION,
                    &e.policy_id,
                    Row::new().with("update_timestamp", ctx.block_time),
                ),
                tombstone(STATEMENTS, &e.policy_id, Row::new()),
            ]),
            _ => Ok(vec![]),
        }
    }
}
