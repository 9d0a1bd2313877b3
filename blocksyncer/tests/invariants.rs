// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

pub mod common;

use std::collections::BTreeSet;

use blocksyncer::chain::AbciEvent;
use bsdb::catalog::{OBJECT_ID_MAP, PERMISSION, STATEMENTS};
use bsdb::metadata::ListObjectsRequest;
use bsdb::models::{FromRow, Object, Permission, PrefixTreeNode, Statement};
use bsdb::{epoch, shard, MemoryStore};

use crate::common::*;

/// Blocks mixing buckets, nested objects, deletions, groups and policies.
fn workload() -> Vec<Vec<AbciEvent>> {
    let statements = serde_json::json!([
        {"effect": "EFFECT_ALLOW", "actions": ["ACTION_GET_OBJECT"]},
        {"effect": "EFFECT_DENY", "actions": ["ACTION_DELETE_OBJECT"]},
    ]);
    vec![
        vec![
            create_bucket(1, "b"),
            create_bucket(2, "alpha"),
            create_object(10, 1, "b", "a/b/c"),
            create_object(11, 1, "b", "a/b/d"),
            create_object(12, 1, "b", "a/e"),
            create_object(13, 1, "b", "f"),
            create_object(14, 2, "alpha", "g/h"),
            group_event("EventCreateGroup", 7),
            add_members(7, &[account(1), account(2)]),
        ],
        vec![
            delete_object(10, "b", "a/b/c"),
            seal_object(12, "b", "a/e"),
            put_policy(5, statements),
            remove_members(7, &[account(2)]),
        ],
        vec![delete_object(14, "alpha", "g/h"), delete_policy(5)],
        vec![create_object(15, 1, "b", "a/b/c")],
    ]
}

fn all_objects(store: &MemoryStore) -> Vec<(String, Object)> {
    shard::all_objects_tables()
        .flat_map(|table| {
            store
                .rows(&table)
                .iter()
                .map(|r| (table.clone(), Object::from_row(r).unwrap()))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn all_nodes(store: &MemoryStore) -> Vec<PrefixTreeNode> {
    shard::all_prefix_tree_tables()
        .flat_map(|table| {
            store
                .rows(&table)
                .iter()
                .map(|r| PrefixTreeNode::from_row(r).unwrap())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn folders_of(name: &str) -> Vec<String> {
    name.match_indices('/')
        .map(|(i, _)| name[..=i].to_owned())
        .collect()
}

fn check_shards_and_id_map(store: &MemoryStore) {
    let map: BTreeSet<(String, String)> = store
        .rows(OBJECT_ID_MAP)
        .iter()
        .map(|r| {
            (r.text("object_id").unwrap(), r.text("bucket_name").unwrap())
        })
        .collect();
    for (table, object) in all_objects(store) {
        assert_eq!(table, shard::table_of(&object.bucket_name));
        assert!(
            map.contains(&(object.object_id.clone(), object.bucket_name)),
            "{} has no id mapping",
            object.object_id
        );
    }
}

fn check_prefix_tree(store: &MemoryStore) {
    let nodes = all_nodes(store);

    let keys: Vec<_> = nodes
        .iter()
        .map(|n| (&n.bucket_name, &n.full_name, n.is_object))
        .collect();
    let unique: BTreeSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len(), "duplicate prefix tree node");

    let folders: BTreeSet<(String, String)> = nodes
        .iter()
        .filter(|n| !n.is_object)
        .map(|n| (n.bucket_name.clone(), n.full_name.clone()))
        .collect();
    for (_, object) in all_objects(store) {
        if object.removed {
            continue;
        }
        for folder in folders_of(&object.object_name) {
            let key = (object.bucket_name.clone(), folder);
            assert!(folders.contains(&key), "missing folder {key:?}");
        }
    }
    for (bucket, folder) in &folders {
        let children = nodes
            .iter()
            .filter(|n| &n.bucket_name == bucket && &n.path_name == folder)
            .count();
        assert!(children > 0, "folder {folder} of {bucket} is empty");
    }
}

fn check_permission_tombstones(store: &MemoryStore) {
    let statements: Vec<Statement> = store
        .rows(STATEMENTS)
        .iter()
        .map(|r| Statement::from_row(r).unwrap())
        .collect();
    for row in store.rows(PERMISSION) {
        let permission = Permission::from_row(&row).unwrap();
        if permission.removed {
            assert!(statements
                .iter()
                .filter(|s| s.policy_id == permission.policy_id)
                .all(|s| s.removed));
        }
    }
}

#[tokio::test]
async fn invariants_hold_after_every_block() {
    let harness = Harness::new().await;
    for (i, events) in workload().into_iter().enumerate() {
        let height = i as u64 + 1;
        harness.process(&block(height, events)).await;

        let epoch = epoch::latest(&harness.store).await.unwrap().unwrap();
        assert_eq!(epoch.block_height, height as i64);
        check_shards_and_id_map(&harness.store);
        check_prefix_tree(&harness.store);
        check_permission_tombstones(&harness.store);
    }
    let permission =
        Permission::from_row(&harness.store.rows(PERMISSION)[0]).unwrap();
    assert!(permission.removed);
}

#[tokio::test]
async fn replaying_each_block_changes_nothing() {
    let once = Harness::new().await;
    let twice = Harness::new().await;
    for (i, events) in workload().into_iter().enumerate() {
        let block = block(i as u64 + 1, events);
        once.process(&block).await;
        twice.process(&block).await;
        twice.process(&block).await;
        assert_eq!(twice.state(), once.state(), "block {}", block.height);
    }
}

#[tokio::test]
async fn flat_listing_pages_visit_every_live_object_once() {
    let harness = Harness::new().await;
    let mut events = vec![create_bucket(1, "b")];
    let names = ["a", "a/b", "c/d/e", "c/f", "g", "h/i", "z"];
    for (i, name) in names.iter().enumerate() {
        events.push(create_object(100 + i as u64, 1, "b", name));
    }
    harness
        .run(1, vec![events, vec![delete_object(104, "b", "g")]])
        .await;

    let reader = harness.reader();
    let mut seen = vec![];
    let mut token = String::new();
    loop {
        let page = reader
            .list_objects_by_bucket_name(&ListObjectsRequest {
                bucket_name: "b".into(),
                continuation_token: token.clone(),
                max_keys: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.objects.len() <= 2);
        seen.extend(page.objects.into_iter().map(|o| o.object_name));
        if !page.is_truncated {
            break;
        }
        token = page.next_continuation_token;
    }
    assert_eq!(seen, vec!["a", "a/b", "c/d/e", "c/f", "h/i", "z"]);
}

#[tokio::test]
async fn delimiter_listing_partitions_the_root() {
    let harness = Harness::new().await;
    harness
        .run(
            1,
            vec![vec![
                create_bucket(1, "b"),
                create_object(10, 1, "b", "a/x"),
                create_object(11, 1, "b", "a/y/z"),
                create_object(12, 1, "b", "b"),
                create_object(13, 1, "b", "c/d"),
            ]],
        )
        .await;
    let page = harness
        .reader()
        .list_objects_by_bucket_name(&ListObjectsRequest {
            bucket_name: "b".into(),
            delimiter: "/".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.common_prefixes, vec!["a/".to_owned(), "c/".to_owned()]);
    let objects: Vec<_> =
        page.objects.iter().map(|o| o.object_name.as_str()).collect();
    assert_eq!(objects, vec!["b"]);
}
