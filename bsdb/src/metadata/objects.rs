// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use super::{
    MetadataReader, DELETED_OBJECTS_DEFAULT_SIZE, LIST_OBJECTS_DEFAULT_MAX_KEYS,
    LIST_OBJECTS_LIMIT_SIZE,
};
use crate::catalog::{BUCKETS, OBJECT_ID_MAP};
use crate::models::{
    Object, PrefixTreeNode, VISIBILITY_INHERIT, VISIBILITY_PUBLIC_READ,
};
use crate::query::{Filter, Order, Select};
use crate::{shard, DbError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket_name: String,
    pub prefix: String,
    /// Either empty (flat listing) or `/`.
    pub delimiter: String,
    /// Base64 token returned by the previous page, empty for the first one.
    pub continuation_token: String,
    /// Zero selects the default page size.
    pub max_keys: u64,
    pub include_removed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListObjectsResponse {
    pub objects: Vec<Object>,
    pub common_prefixes: Vec<String>,
    pub key_count: u64,
    pub max_keys: u64,
    pub is_truncated: bool,
    /// Base64 token of the next page, empty on the last page.
    pub next_continuation_token: String,
    pub name: String,
    pub prefix: String,
    pub delimiter: String,
    pub continuation_token: String,
}

/// One entry of a listing page.
enum Entry {
    Object(Box<Object>),
    CommonPrefix(String),
}

/// Entries of a page and the key the next page starts at. The key comes
/// from the rows fetched, so skipped rows never hide a following page.
struct Page {
    entries: Vec<Entry>,
    next: Option<String>,
}

/// Split a prefix into the folder to list and the name filter inside it.
/// A prefix without `/` lists the root folder `/`.
pub(crate) fn split_prefix(prefix: &str) -> (String, String) {
    match prefix.rfind('/') {
        Some(i) => (prefix[..=i].to_owned(), prefix[i + 1..].to_owned()),
        None => ("/".to_owned(), prefix.to_owned()),
    }
}

/// Whether an object is visible without the private flag.
fn is_public(object: &Object, bucket_visibility: Option<&str>) -> bool {
    object.visibility == VISIBILITY_PUBLIC_READ
        || (object.visibility == VISIBILITY_INHERIT
            && bucket_visibility == Some(VISIBILITY_PUBLIC_READ))
}

impl MetadataReader {
    /// List a bucket, either flat by object name or one folder level when the
    /// delimiter is `/`.
    pub async fn list_objects_by_bucket_name(
        &self,
        req: &ListObjectsRequest,
    ) -> Result<ListObjectsResponse, DbError> {
        let max_keys = match req.max_keys {
            0 => LIST_OBJECTS_DEFAULT_MAX_KEYS,
            n => n.min(LIST_OBJECTS_LIMIT_SIZE),
        };
        let token = STANDARD
            .decode(&req.continuation_token)
            .ok()
            .and_then(|t| String::from_utf8(t).ok())
            .ok_or_else(|| {
                DbError::InvalidArgument(format!(
                    "invalid continuation token {}",
                    req.continuation_token
                ))
            })?;

        // One extra row tells whether another page exists
        let limit = max_keys + 1;
        let page = match req.delimiter.as_str() {
            "" => self.list_flat(req, &token, limit).await?,
            "/" => self.list_folder(req, &token, limit).await?,
            other => {
                return Err(DbError::InvalidArgument(format!(
                    "unsupported delimiter {other}"
                )))
            }
        };
        let Page { entries, next } = page;

        let mut resp = ListObjectsResponse {
            key_count: entries.len() as u64,
            max_keys,
            is_truncated: next.is_some(),
            next_continuation_token: next
                .map(|key| STANDARD.encode(key))
                .unwrap_or_default(),
            name: req.bucket_name.clone(),
            prefix: req.prefix.clone(),
            delimiter: req.delimiter.clone(),
            continuation_token: req.continuation_token.clone(),
            ..Default::default()
        };
        for entry in entries {
            match entry {
                Entry::Object(o) => resp.objects.push(*o),
                Entry::CommonPrefix(p) => resp.common_prefixes.push(p),
            }
        }
        Ok(resp)
    }

    async fn list_flat(
        &self,
        req: &ListObjectsRequest,
        token: &str,
        limit: u64,
    ) -> Result<Page, DbError> {
        let mut filter = Filter::new()
            .eq("bucket_name", req.bucket_name.as_str())
            .like_prefix("object_name", &req.prefix);
        if !token.is_empty() {
            filter = filter.gte("object_name", token);
        }
        if !req.include_removed {
            filter = filter.eq("removed", false);
        }
        let mut objects: Vec<Object> = self
            .all(
                Select::from(&shard::table_of(&req.bucket_name))
                    .filter(filter)
                    .order_by("object_name", Order::Asc)
                    .limit(limit),
            )
            .await?;
        let next = if objects.len() as u64 == limit {
            objects.pop().map(|o| o.object_name)
        } else {
            None
        };
        Ok(Page {
            entries: objects
                .into_iter()
                .map(|o| Entry::Object(Box::new(o)))
                .collect(),
            next,
        })
    }

    async fn list_folder(
        &self,
        req: &ListObjectsRequest,
        token: &str,
        limit: u64,
    ) -> Result<Page, DbError> {
        let (dir, name_query) = split_prefix(&req.prefix);
        let mut filter = Filter::new()
            .eq("bucket_name", req.bucket_name.as_str())
            .eq("path_name", dir.as_str());
        if !name_query.is_empty() {
            filter = filter.like_prefix("name", &name_query);
        }
        if !token.is_empty() {
            filter = filter.gte("full_name", token);
        }
        let mut nodes: Vec<PrefixTreeNode> = self
            .all(
                Select::from(&shard::prefix_table_of(&req.bucket_name))
                    .filter(filter)
                    .order_by("full_name", Order::Asc)
                    .limit(limit),
            )
            .await?;
        // A node's full name is its object name or its common prefix
        let next = if nodes.len() as u64 == limit {
            nodes.pop().map(|n| n.full_name)
        } else {
            None
        };

        let ids: Vec<&str> = nodes
            .iter()
            .filter(|n| n.is_object)
            .map(|n| n.object_id.as_str())
            .collect();
        let mut objects: HashMap<String, Object> = HashMap::new();
        if !ids.is_empty() {
            let mut filter = Filter::new().is_in("object_id", ids);
            if !req.include_removed {
                filter = filter.eq("removed", false);
            }
            let rows: Vec<Object> = self
                .all(
                    Select::from(&shard::table_of(&req.bucket_name))
                        .filter(filter),
                )
                .await?;
            objects = rows
                .into_iter()
                .map(|o| (o.object_id.clone(), o))
                .collect();
        }

        let entries = nodes
            .into_iter()
            .filter_map(|node| {
                if node.is_object {
                    // Nodes without an object row are skipped
                    objects
                        .remove(&node.object_id)
                        .map(|o| Entry::Object(Box::new(o)))
                } else {
                    Some(Entry::CommonPrefix(node.full_name))
                }
            })
            .collect();
        Ok(Page { entries, next })
    }

    /// Objects removed between two heights (inclusive), ordered by
    /// `(update_at, object_id)`.
    pub async fn list_deleted_objects_by_block_number_range(
        &self,
        start_block: i64,
        end_block: i64,
        include_private: bool,
    ) -> Result<Vec<Object>, DbError> {
        let latest =
            i64::try_from(self.get_latest_block_number().await?).unwrap_or(i64::MAX);
        let end_block = end_block.min(latest);

        let mut deleted = vec![];
        for table in shard::all_objects_tables() {
            let objects: Vec<Object> = self
                .all(
                    Select::from(&table)
                        .filter(
                            Filter::new()
                                .gte("update_at", start_block)
                                .lte("update_at", end_block)
                                .eq("removed", true),
                        )
                        .order_by("update_at", Order::Asc)
                        .order_by("object_id", Order::Asc)
                        .limit(DELETED_OBJECTS_DEFAULT_SIZE),
                )
                .await?;
            deleted.extend(objects);
        }
        if !include_private {
            deleted = self.retain_public(deleted).await?;
        }
        deleted.sort_by(|a, b| {
            (a.tracking.update_at, &a.object_id)
                .cmp(&(b.tracking.update_at, &b.object_id))
        });
        deleted.truncate(DELETED_OBJECTS_DEFAULT_SIZE as usize);
        Ok(deleted)
    }

    async fn retain_public(
        &self,
        objects: Vec<Object>,
    ) -> Result<Vec<Object>, DbError> {
        let mut inherit: Vec<&str> = objects
            .iter()
            .filter(|o| o.visibility == VISIBILITY_INHERIT)
            .map(|o| o.bucket_id.as_str())
            .collect();
        inherit.sort_unstable();
        inherit.dedup();

        let mut bucket_visibility = HashMap::new();
        if !inherit.is_empty() {
            let rows = self
                .store
                .select(
                    &Select::from(BUCKETS)
                        .filter(Filter::new().is_in("bucket_id", inherit)),
                )
                .await?;
            for row in rows {
                bucket_visibility
                    .insert(row.text("bucket_id")?, row.text("visibility")?);
            }
        }
        Ok(objects
            .into_iter()
            .filter(|o| {
                is_public(
                    o,
                    bucket_visibility.get(&o.bucket_id).map(String::as_str),
                )
            })
            .collect())
    }

    /// Look an object up by bucket and name. Removed objects are not
    /// returned.
    pub async fn get_object_by_name(
        &self,
        bucket_name: &str,
        object_name: &str,
        include_private: bool,
    ) -> Result<Option<Object>, DbError> {
        let object: Option<Object> = self
            .one(
                Select::from(&shard::table_of(bucket_name)).filter(
                    Filter::new()
                        .eq("bucket_name", bucket_name)
                        .eq("object_name", object_name)
                        .eq("removed", false),
                ),
            )
            .await?;
        match object {
            Some(o) if !include_private => {
                Ok(self.retain_public(vec![o]).await?.into_iter().next())
            }
            other => Ok(other),
        }
    }

    /// Resolve the bucket of an object through the id map, then read it from
    /// the bucket's shard.
    pub async fn get_object_by_id(
        &self,
        object_id: &str,
        include_removed: bool,
    ) -> Result<Option<Object>, DbError> {
        let Some(map) = self
            .store
            .select_one(
                &Select::from(OBJECT_ID_MAP)
                    .filter(Filter::new().eq("object_id", object_id)),
            )
            .await?
        else {
            return Ok(None);
        };
        let bucket_name = map.text("bucket_name")?;
        let mut filter = Filter::new().eq("object_id", object_id);
        if !include_removed {
            filter = filter.eq("removed", false);
        }
        self.one(Select::from(&shard::table_of(&bucket_name)).filter(filter))
            .await
    }
}
