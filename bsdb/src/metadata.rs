// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Read side queried by the metadata service.
//!
//! Every method runs on the reader pool and only ever observes whole blocks.

mod objects;
mod virtual_groups;

use std::sync::Arc;

pub use objects::{ListObjectsRequest, ListObjectsResponse};

use crate::catalog::{
    BUCKETS, GROUPS, PAYMENT_ACCOUNTS, PERMISSION, STATEMENTS, STREAM_RECORDS,
};
use crate::models::{
    decode_all, Bucket, FromRow, Group, PaymentAccount, Permission, Statement,
    StreamRecord, VISIBILITY_PUBLIC_READ,
};
use crate::query::{Filter, Order, Select};
use crate::value::ZERO_ADDRESS;
use crate::{epoch, master, DbError, Store};

/// Default page size of the listing operations.
pub const LIST_OBJECTS_DEFAULT_MAX_KEYS: u64 = 50;
/// Hard page size limit of the listing operations.
pub const LIST_OBJECTS_LIMIT_SIZE: u64 = 1000;
/// Page size of the deleted objects listing.
pub const DELETED_OBJECTS_DEFAULT_SIZE: u64 = 1000;

/// Read API over a [`Store`].
#[derive(Clone)]
pub struct MetadataReader {
    store: Arc<dyn Store>,
}

impl MetadataReader {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn one<T: FromRow>(
        &self,
        select: Select,
    ) -> Result<Option<T>, DbError> {
        self.store
            .select_one(&select)
            .await?
            .map(|row| T::from_row(&row))
            .transpose()
    }

    async fn all<T: FromRow>(&self, select: Select) -> Result<Vec<T>, DbError> {
        let rows = self.store.select(&select).await?;
        decode_all(&rows)
    }

    /// Height of the last committed block.
    pub async fn get_latest_block_number(&self) -> Result<u64, DbError> {
        let epoch = epoch::latest(self.store.as_ref())
            .await?
            .ok_or_else(|| DbError::NotFound("epoch".into()))?;
        Ok(u64::try_from(epoch.block_height).unwrap_or_default())
    }

    /// Whether this database is the master.
    pub async fn get_switch_db_signal(&self) -> Result<bool, DbError> {
        master::get_signal(self.store.as_ref())
            .await?
            .ok_or_else(|| DbError::NotFound("master_db".into()))
    }

    async fn get_bucket(
        &self,
        filter: Filter,
        include_private: bool,
    ) -> Result<Option<Bucket>, DbError> {
        let mut filter = filter.eq("removed", false);
        if !include_private {
            filter = filter.eq("visibility", VISIBILITY_PUBLIC_READ);
        }
        self.one(Select::from(BUCKETS).filter(filter)).await
    }

    pub async fn get_bucket_by_name(
        &self,
        bucket_name: &str,
        include_private: bool,
    ) -> Result<Option<Bucket>, DbError> {
        self.get_bucket(Filter::new().eq("bucket_name", bucket_name), include_private)
            .await
    }

    pub async fn get_bucket_by_id(
        &self,
        bucket_id: &str,
        include_private: bool,
    ) -> Result<Option<Bucket>, DbError> {
        self.get_bucket(Filter::new().eq("bucket_id", bucket_id), include_private)
            .await
    }

    /// Buckets owned by `account`, in creation order.
    pub async fn list_user_buckets(
        &self,
        account: &str,
        include_removed: bool,
    ) -> Result<Vec<Bucket>, DbError> {
        let mut filter = Filter::new().eq("owner", account);
        if !include_removed {
            filter = filter.eq("removed", false);
        }
        self.all(
            Select::from(BUCKETS)
                .filter(filter)
                .order_by("create_at", Order::Asc)
                .order_by("bucket_name", Order::Asc),
        )
        .await
    }

    pub async fn get_payment_by_payment_address(
        &self,
        payment_address: &str,
    ) -> Result<Option<StreamRecord>, DbError> {
        self.one(
            Select::from(STREAM_RECORDS)
                .filter(Filter::new().eq("account", payment_address)),
        )
        .await
    }

    pub async fn get_payment_account(
        &self,
        addr: &str,
    ) -> Result<Option<PaymentAccount>, DbError> {
        self.one(
            Select::from(PAYMENT_ACCOUNTS).filter(Filter::new().eq("addr", addr)),
        )
        .await
    }

    pub async fn get_payment_by_bucket_name(
        &self,
        bucket_name: &str,
        include_private: bool,
    ) -> Result<Option<StreamRecord>, DbError> {
        match self.get_bucket_by_name(bucket_name, include_private).await? {
            Some(bucket) => {
                self.get_payment_by_payment_address(&bucket.payment_address)
                    .await
            }
            None => Ok(None),
        }
    }

    pub async fn get_payment_by_bucket_id(
        &self,
        bucket_id: &str,
        include_private: bool,
    ) -> Result<Option<StreamRecord>, DbError> {
        match self.get_bucket_by_id(bucket_id, include_private).await? {
            Some(bucket) => {
                self.get_payment_by_payment_address(&bucket.payment_address)
                    .await
            }
            None => Ok(None),
        }
    }

    /// The live permission bound to a resource and principal.
    pub async fn get_permission_by_resource_and_principal(
        &self,
        resource_type: &str,
        resource_id: &str,
        principal_type: i64,
        principal_value: &str,
    ) -> Result<Option<Permission>, DbError> {
        self.one(
            Select::from(PERMISSION).filter(
                Filter::new()
                    .eq("resource_type", resource_type)
                    .eq("resource_id", resource_id)
                    .eq("principal_type", principal_type)
                    .eq("principal_value", principal_value)
                    .eq("removed", false),
            ),
        )
        .await
    }

    /// Live statements of the given policies, by policy then index.
    pub async fn list_statements_by_policy_id(
        &self,
        policy_ids: &[String],
    ) -> Result<Vec<Statement>, DbError> {
        if policy_ids.is_empty() {
            return Ok(vec![]);
        }
        self.all(
            Select::from(STATEMENTS)
                .filter(
                    Filter::new()
                        .is_in("policy_id", policy_ids)
                        .eq("removed", false),
                )
                .order_by("policy_id", Order::Asc)
                .order_by("statement_index", Order::Asc),
        )
        .await
    }

    /// Live memberships of `account` in the given groups. A membership of a
    /// removed group is not returned.
    pub async fn list_groups_by_group_id_and_account(
        &self,
        group_ids: &[String],
        account: &str,
    ) -> Result<Vec<Group>, DbError> {
        if group_ids.is_empty() {
            return Ok(vec![]);
        }
        let members: Vec<Group> = self
            .all(
                Select::from(GROUPS)
                    .filter(
                        Filter::new()
                            .is_in("group_id", group_ids)
                            .eq("account_id", account)
                            .eq("removed", false),
                    )
                    .order_by("group_id", Order::Asc),
            )
            .await?;
        if members.is_empty() || account == ZERO_ADDRESS {
            return Ok(members);
        }
        let live_groups: Vec<Group> = self
            .all(
                Select::from(GROUPS).filter(
                    Filter::new()
                        .is_in("group_id", members.iter().map(|m| &m.group_id))
                        .eq("account_id", ZERO_ADDRESS)
                        .eq("removed", false),
                ),
            )
            .await?;
        Ok(members
            .into_iter()
            .filter(|m| live_groups.iter().any(|g| g.group_id == m.group_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Row;
    use crate::{MemoryStore, StoreTx};

    async fn seed(store: &MemoryStore, rows: Vec<(&str, &[&str], Row)>) {
        let mut tx = store.begin().await.unwrap();
        for (table, keys, row) in rows {
            tx.upsert_by(table, keys, row).await.unwrap();
        }
        tx.commit().await.unwrap();
    }

    fn bucket(id: &str, name: &str, visibility: &str) -> Row {
        Row::new()
            .with("bucket_id", id)
            .with("bucket_name", name)
            .with("owner", "0xaa")
            .with("payment_address", "0xpay")
            .with("visibility", visibility)
            .with("status", "CREATED")
    }

    #[tokio::test]
    async fn test_bucket_visibility_and_payment() {
        let store = MemoryStore::new();
        let by_id: &[&str] = &["bucket_id"];
        let by_account: &[&str] = &["account"];
        seed(
            &store,
            vec![
                (BUCKETS, by_id, bucket("0x01", "pub", "PUBLIC_READ")),
                (BUCKETS, by_id, bucket("0x02", "priv", "PRIVATE")),
                (
                    STREAM_RECORDS,
                    by_account,
                    Row::new()
                        .with("account", "0xpay")
                        .with("static_balance", "100000000000000000000"),
                ),
            ],
        )
        .await;
        let reader = MetadataReader::new(Arc::new(store));

        assert!(reader.get_bucket_by_name("pub", false).await.unwrap().is_some());
        assert!(reader.get_bucket_by_name("priv", false).await.unwrap().is_none());
        assert!(reader.get_bucket_by_id("0x02", true).await.unwrap().is_some());

        let payment = reader
            .get_payment_by_bucket_name("priv", true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.static_balance, "100000000000000000000");
        assert!(reader
            .get_payment_by_bucket_id("0x02", false)
            .await
            .unwrap()
            .is_none());

        let buckets = reader.list_user_buckets("0xaa", false).await.unwrap();
        assert_eq!(buckets.len(), 2);
    }

    #[tokio::test]
    async fn test_memberships_of_removed_groups_are_hidden() {
        let store = MemoryStore::new();
        let member = |group: &str, account: &str, removed: bool| {
            Row::new()
                .with("group_id", group)
                .with("account_id", account)
                .with("removed", removed)
        };
        let keys: &[&str] = &["group_id", "account_id"];
        seed(
            &store,
            vec![
                (GROUPS, keys, member("0x02", ZERO_ADDRESS, false)),
                (GROUPS, keys, member("0x02", "0xa1", false)),
                (GROUPS, keys, member("0x03", ZERO_ADDRESS, true)),
                (GROUPS, keys, member("0x03", "0xa1", false)),
                (GROUPS, keys, member("0x04", ZERO_ADDRESS, false)),
                (GROUPS, keys, member("0x04", "0xa1", true)),
            ],
        )
        .await;
        let reader = MetadataReader::new(Arc::new(store));
        let ids = vec!["0x02".to_owned(), "0x03".to_owned(), "0x04".to_owned()];
        let groups = reader
            .list_groups_by_group_id_and_account(&ids, "0xa1")
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_id, "0x02");
    }

    #[tokio::test]
    async fn test_latest_block_and_signal_require_rows() {
        let store = MemoryStore::new();
        let reader = MetadataReader::new(Arc::new(store.clone()));
        assert_eq!(
            reader.get_latest_block_number().await.unwrap_err().kind(),
            "not_found"
        );
        assert!(reader.get_switch_db_signal().await.is_err());

        let mut tx = store.begin().await.unwrap();
        tx.apply(&epoch::advance(42, "0xab", 0)).await.unwrap();
        tx.commit().await.unwrap();
        master::ensure_signal(&store).await.unwrap();

        assert_eq!(reader.get_latest_block_number().await.unwrap(), 42);
        assert!(reader.get_switch_db_signal().await.unwrap());
    }
}
