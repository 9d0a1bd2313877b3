// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! The slash-separated prefix tree used for folder listings.
//!
//! An object `a/b/c` is stored as the object node `c` under path `a/b/`,
//! with folder nodes `a/` (under `/`) and `a/b/` (under `a/`). Folders are
//! created with their first object and dropped with their last child.

use async_trait::async_trait;
use bsdb::catalog::{self, TableDef};
use bsdb::value::ZERO_HASH;
use bsdb::{shard, Filter, Row, RowMutation, StoreTx};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::*;
use crate::registry::{apply, Direct, Handler, Module};

const EVENTS: &[&str] = &[
    EVENT_CREATE_OBJECT,
    EVENT_COPY_OBJECT,
    EVENT_DELETE_OBJECT,
    EVENT_CANCEL_CREATE_OBJECT,
    EVENT_REJECT_SEAL_OBJECT,
];

const NODE_KEYS: &[&str] = &["bucket_name", "full_name_hash", "is_object"];

pub struct PrefixTreeModule;

impl Module for PrefixTreeModule {
    fn name(&self) -> &'static str {
        "prefix_tree"
    }

    fn interested_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
        Ok(catalog::prefix_tree_tables())
    }

    fn handler(&self) -> Handler<'_> {
        Handler::Direct(self)
    }
}

/// Folder prefixes of `object_name`, deepest first: `a/b/c` gives
/// `["a/b/", "a/"]`.
pub fn folders_of(object_name: &str) -> Vec<&str> {
    object_name
        .match_indices('/')
        .map(|(i, _)| &object_name[..=i])
        .rev()
        .collect()
}

/// Folder holding the folder `full_name` (which ends in `/`), `/` at the
/// root.
pub fn parent_of(full_name: &str) -> &str {
    let trimmed = full_name.strip_suffix('/').unwrap_or(full_name);
    match trimmed.rfind('/') {
        Some(i) => &trimmed[..=i],
        None => "/",
    }
}

/// Last segment of the folder `full_name`, keeping its trailing `/`.
fn base_name(full_name: &str) -> &str {
    let parent = parent_of(full_name);
    if parent == "/" {
        full_name
    } else {
        &full_name[parent.len()..]
    }
}

/// Folder and name of an object node. An object named `x/` lives in folder
/// `x/` under the empty name.
pub fn split_object(object_name: &str) -> (&str, &str) {
    match object_name.rfind('/') {
        Some(i) => (&object_name[..=i], &object_name[i + 1..]),
        None => ("/", object_name),
    }
}

/// Fixed-width key of a node name, `0x` prefixed SHA-256.
pub fn name_hash(full_name: &str) -> String {
    format!("0x{}", hex::encode(Sha256::digest(full_name.as_bytes())))
}

fn node(bucket_name: &str, full_name: &str, is_object: bool) -> Filter {
    Filter::new()
        .eq("bucket_name", bucket_name)
        .eq("full_name_hash", name_hash(full_name))
        .eq("is_object", is_object)
}

fn folder_row(bucket_name: &str, full_name: &str) -> Row {
    Row::new()
        .with("bucket_name", bucket_name)
        .with("path_name", parent_of(full_name))
        .with("full_name", full_name)
        .with("full_name_hash", name_hash(full_name))
        .with("name", base_name(full_name))
        .with("is_object", false)
        .with("is_folder", true)
        .with("object_id", ZERO_HASH)
        .with("object_name", "")
}

fn object_row(bucket_name: &str, object_name: &str, object_id: &str) -> Row {
    let (path_name, name) = split_object(object_name);
    Row::new()
        .with("bucket_name", bucket_name)
        .with("path_name", path_name)
        .with("full_name", object_name)
        .with("full_name_hash", name_hash(object_name))
        .with("name", name)
        .with("is_object", true)
        .with("is_folder", false)
        .with("object_id", object_id)
        .with("object_name", object_name)
}

impl PrefixTreeModule {
    async fn folder_exists(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        table: &str,
        bucket_name: &str,
        folder: &str,
    ) -> Result<bool, SyncError> {
        let key = (bucket_name.to_owned(), folder.to_owned());
        if let Some(exists) = ctx.folders.get(&key) {
            return Ok(*exists);
        }
        let exists = tx
            .as_lookup()
            .count(table, &node(bucket_name, folder, false))
            .await?
            > 0;
        ctx.folders.insert(key, exists);
        Ok(exists)
    }

    async fn add_object(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        bucket_name: &str,
        object_name: &str,
        object_id: &str,
    ) -> Result<(), SyncError> {
        let table = shard::prefix_table_of(bucket_name);
        let mut nodes = vec![];
        for folder in folders_of(object_name) {
            if self
                .folder_exists(ctx, tx, &table, bucket_name, folder)
                .await?
            {
                break;
            }
            nodes.push(folder_row(bucket_name, folder));
            ctx.folders
                .insert((bucket_name.to_owned(), folder.to_owned()), true);
        }

        let known = tx
            .as_lookup()
            .count(&table, &Filter::new().eq("object_id", object_id))
            .await?
            > 0;
        if !known {
            nodes.push(object_row(bucket_name, object_name, object_id));
        }
        if nodes.is_empty() {
            return Ok(());
        }
        debug!(
            bucket = bucket_name,
            object = object_name,
            nodes = nodes.len(),
            "Adding prefix tree nodes"
        );
        apply(ctx, tx, &RowMutation::batch_insert(&table, NODE_KEYS, nodes))
            .await?;
        Ok(())
    }

    async fn remove_object(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        bucket_name: &str,
        object_name: &str,
    ) -> Result<(), SyncError> {
        let table = shard::prefix_table_of(bucket_name);
        let object = node(bucket_name, object_name, true);
        if tx.as_lookup().count(&table, &object).await? == 0 {
            debug!(
                bucket = bucket_name,
                object = object_name,
                "No prefix tree node to remove"
            );
            return Ok(());
        }

        // Children are counted before anything is deleted, so the child
        // being removed is part of every count.
        let mut deletes = vec![object];
        for folder in folders_of(object_name) {
            let children = tx
                .as_lookup()
                .count(
                    &table,
                    &Filter::new()
                        .eq("bucket_name", bucket_name)
                        .eq("path_name", folder),
                )
                .await?;
            if children > 1 {
                break;
            }
            deletes.push(node(bucket_name, folder, false));
            ctx.folders
                .insert((bucket_name.to_owned(), folder.to_owned()), false);
        }
        apply(ctx, tx, &RowMutation::delete_any(&table, deletes)).await?;
        Ok(())
    }
}

#[async_trait]
impl Direct for PrefixTreeModule {
    async fn handle(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        event: &Event,
    ) -> Result<(), SyncError> {
        match event {
            Event::CreateObject(e) => {
                self.add_object(ctx, tx, &e.bucket_name, &e.object_name, &e.object_id)
                    .await
            }
            Event::CopyObject(e) => {
                self.add_object(
                    ctx,
                    tx,
                    &e.dst_bucket_name,
                    &e.dst_object_name,
                    &e.dst_object_id,
                )
                .await
            }
            Event::DeleteObject(e) => {
                self.remove_object(ctx, tx, &e.bucket_name, &e.object_name)
                    .await
            }
            Event::CancelCreateObject(e) => {
                self.remove_object(ctx, tx, &e.bucket_name, &e.object_name)
                    .await
            }
            // A rejected content update leaves the object in place
            Event::RejectSealObject(e) if !e.for_update => {
                self.remove_object(ctx, tx, &e.bucket_name, &e.object_name)
                    .await
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use bsdb::models::{FromRow, PrefixTreeNode};
    use bsdb::MemoryStore;

    use super::*;
    use crate::modules::testing::*;

    fn nodes(store: &MemoryStore, bucket: &str) -> Vec<(String, String, bool)> {
        let mut nodes: Vec<_> = store
            .rows(&shard::prefix_table_of(bucket))
            .iter()
            .map(|r| PrefixTreeNode::from_row(r).unwrap())
            .map(|n| (n.full_name, n.path_name, n.is_object))
            .collect();
        nodes.sort();
        nodes
    }

    fn entry(full: &str, path: &str, is_object: bool) -> (String, String, bool) {
        (full.to_owned(), path.to_owned(), is_object)
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(folders_of("a/b/c"), vec!["a/b/", "a/"]);
        assert!(folders_of("c").is_empty());
        assert_eq!(parent_of("a/b/c"), "a/b/");
        assert_eq!(parent_of("a/b/"), "a/");
        assert_eq!(parent_of("a/"), "/");
        assert_eq!(parent_of("c"), "/");
        assert_eq!(base_name("a/b/"), "b/");
        assert_eq!(base_name("a/b/c"), "c");
        assert_eq!(base_name("c"), "c");
        assert_eq!(split_object("a/b/c"), ("a/b/", "c"));
        assert_eq!(split_object("a/b/"), ("a/b/", ""));
        assert_eq!(split_object("c"), ("/", "c"));
    }

    #[tokio::test]
    async fn test_longest_names_are_indexed() {
        let (dispatcher, store) = setup().await;
        let folder = format!("{}/", "d".repeat(600));
        let name = format!("{folder}{}", "f".repeat(423));
        assert_eq!(name.len(), 1024);
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![vec![
                create_bucket(1, "b"),
                create_object(10, "b", &name, 1),
            ]],
        )
        .await;
        assert_eq!(
            nodes(&store, "b"),
            vec![entry(&folder, "/", false), entry(&name, &folder, true)]
        );
        let hashes: Vec<String> = store
            .rows(&shard::prefix_table_of("b"))
            .iter()
            .map(|r| r.text("full_name_hash").unwrap())
            .collect();
        assert!(hashes.contains(&name_hash(&name)));
        assert!(hashes.iter().all(|h| h.len() == 66));

        run_blocks(
            &dispatcher,
            &store,
            2,
            vec![vec![object_event("EventDeleteObject", 10, "b", &name)]],
        )
        .await;
        assert!(nodes(&store, "b").is_empty());
    }

    #[tokio::test]
    async fn test_folder_named_object_keeps_its_folder() {
        let (dispatcher, store) = setup().await;
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![vec![
                create_bucket(1, "b"),
                create_object(10, "b", "x/", 0),
                create_object(11, "b", "x/a", 1),
            ]],
        )
        .await;
        assert_eq!(
            nodes(&store, "b"),
            vec![
                entry("x/", "/", false),
                entry("x/", "x/", true),
                entry("x/a", "x/", true),
            ]
        );

        run_blocks(
            &dispatcher,
            &store,
            2,
            vec![vec![object_event("EventDeleteObject", 10, "b", "x/")]],
        )
        .await;
        assert_eq!(
            nodes(&store, "b"),
            vec![entry("x/", "/", false), entry("x/a", "x/", true)]
        );

        run_blocks(
            &dispatcher,
            &store,
            3,
            vec![vec![object_event("EventDeleteObject", 11, "b", "x/a")]],
        )
        .await;
        assert!(nodes(&store, "b").is_empty());
    }

    #[tokio::test]
    async fn test_create_adds_missing_folders_once() {
        let (dispatcher, store) = setup().await;
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![vec![
                create_bucket(1, "b"),
                create_object(10, "b", "x/y/z", 1),
                create_object(11, "b", "x/y/w", 1),
                create_object(12, "b", "k", 1),
            ]],
        )
        .await;
        assert_eq!(
            nodes(&store, "b"),
            vec![
                entry("k", "/", true),
                entry("x/", "/", false),
                entry("x/y/", "x/", false),
                entry("x/y/w", "x/y/", true),
                entry("x/y/z", "x/y/", true),
            ]
        );
    }

    #[tokio::test]
    async fn test_folder_dropped_with_last_child() {
        let (dispatcher, store) = setup().await;
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![
                vec![
                    create_bucket(1, "b"),
                    create_object(10, "b", "x/y/z", 1),
                    create_object(11, "b", "x/k", 1),
                ],
                vec![object_event("EventDeleteObject", 10, "b", "x/y/z")],
            ],
        )
        .await;
        assert_eq!(
            nodes(&store, "b"),
            vec![entry("x/", "/", false), entry("x/k", "x/", true)]
        );
    }

    #[tokio::test]
    async fn test_delete_and_recreate_in_one_block() {
        let (dispatcher, store) = setup().await;
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![
                vec![create_bucket(1, "b"), create_object(10, "b", "x/y", 1)],
                vec![
                    object_event("EventDeleteObject", 10, "b", "x/y"),
                    create_object(11, "b", "x/y", 1),
                ],
            ],
        )
        .await;
        assert_eq!(
            nodes(&store, "b"),
            vec![entry("x/", "/", false), entry("x/y", "x/", true)]
        );
    }

    #[tokio::test]
    async fn test_reject_for_update_keeps_nodes() {
        let (dispatcher, store) = setup().await;
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![
                vec![create_bucket(1, "b"), create_object(10, "b", "x/y", 1)],
                vec![object_event("EventRejectSealObject", 10, "b", "x/y")
                    .attr("for_update", "true")],
            ],
        )
        .await;
        assert_eq!(nodes(&store, "b").len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_object_removal_is_ignored() {
        let (dispatcher, store) = setup().await;
        run_blocks(
            &dispatcher,
            &store,
            1,
            vec![
                vec![create_bucket(1, "b"), create_object(10, "b", "x/y", 1)],
                vec![object_event("EventCancelCreateObject", 99, "b", "x/q")],
            ],
        )
        .await;
        assert_eq!(nodes(&store, "b").len(), 2);
    }
}
