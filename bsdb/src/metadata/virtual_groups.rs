// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use super::MetadataReader;
use crate::catalog::{
    GLOBAL_VIRTUAL_GROUP, GLOBAL_VIRTUAL_GROUP_FAMILIES, LOCAL_VIRTUAL_GROUP,
    STORAGE_PROVIDERS,
};
use crate::models::{
    GlobalVirtualGroup, GlobalVirtualGroupFamily, LocalVirtualGroup,
    StorageProvider,
};
use crate::query::{Filter, Order, Select};
use crate::DbError;

fn live() -> Filter {
    Filter::new().eq("removed", false)
}

impl MetadataReader {
    pub async fn get_storage_provider(
        &self,
        sp_id: u32,
    ) -> Result<Option<StorageProvider>, DbError> {
        self.one(
            Select::from(STORAGE_PROVIDERS)
                .filter(Filter::new().eq("sp_id", sp_id)),
        )
        .await
    }

    pub async fn list_storage_providers(
        &self,
    ) -> Result<Vec<StorageProvider>, DbError> {
        self.all(
            Select::from(STORAGE_PROVIDERS)
                .filter(live())
                .order_by("sp_id", Order::Asc),
        )
        .await
    }

    pub async fn get_global_virtual_group_by_id(
        &self,
        gvg_id: u32,
    ) -> Result<Option<GlobalVirtualGroup>, DbError> {
        self.one(
            Select::from(GLOBAL_VIRTUAL_GROUP)
                .filter(live().eq("global_virtual_group_id", gvg_id)),
        )
        .await
    }

    pub async fn list_global_virtual_groups_by_family_id(
        &self,
        family_id: u32,
    ) -> Result<Vec<GlobalVirtualGroup>, DbError> {
        self.list_gvgs(live().eq("family_id", family_id)).await
    }

    pub async fn list_global_virtual_groups_by_primary_sp(
        &self,
        sp_id: u32,
    ) -> Result<Vec<GlobalVirtualGroup>, DbError> {
        self.list_gvgs(live().eq("primary_sp_id", sp_id)).await
    }

    /// Groups where `sp_id` is one of the secondaries.
    pub async fn list_global_virtual_groups_by_secondary_sp(
        &self,
        sp_id: u32,
    ) -> Result<Vec<GlobalVirtualGroup>, DbError> {
        self.list_gvgs(live().csv_contains("secondary_sp_ids", sp_id))
            .await
    }

    async fn list_gvgs(
        &self,
        filter: Filter,
    ) -> Result<Vec<GlobalVirtualGroup>, DbError> {
        self.all(
            Select::from(GLOBAL_VIRTUAL_GROUP)
                .filter(filter)
                .order_by("global_virtual_group_id", Order::Asc),
        )
        .await
    }

    pub async fn get_local_virtual_group(
        &self,
        bucket_id: &str,
        lvg_id: u32,
    ) -> Result<Option<LocalVirtualGroup>, DbError> {
        self.one(
            Select::from(LOCAL_VIRTUAL_GROUP).filter(
                live()
                    .eq("bucket_id", bucket_id)
                    .eq("local_virtual_group_id", lvg_id),
            ),
        )
        .await
    }

    pub async fn get_virtual_group_family(
        &self,
        family_id: u32,
    ) -> Result<Option<GlobalVirtualGroupFamily>, DbError> {
        self.one(
            Select::from(GLOBAL_VIRTUAL_GROUP_FAMILIES)
                .filter(live().eq("global_virtual_group_family_id", family_id)),
        )
        .await
    }

    pub async fn list_virtual_group_families_by_sp(
        &self,
        sp_id: u32,
    ) -> Result<Vec<GlobalVirtualGroupFamily>, DbError> {
        self.all(
            Select::from(GLOBAL_VIRTUAL_GROUP_FAMILIES)
                .filter(live().eq("primary_sp_id", sp_id))
                .order_by("global_virtual_group_family_id", Order::Asc),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::value::Row;
    use crate::{MemoryStore, Store, StoreTx};

    #[tokio::test]
    async fn test_secondary_sp_matches_whole_ids() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for (id, primary, secondaries, removed) in [
            (1u32, 1u32, "2,3,12", false),
            (2, 2, "1,12", false),
            (3, 1, "2", true),
        ] {
            tx.upsert_by(
                GLOBAL_VIRTUAL_GROUP,
                &["global_virtual_group_id"],
                Row::new()
                    .with("global_virtual_group_id", id)
                    .with("family_id", 7u32)
                    .with("primary_sp_id", primary)
                    .with("secondary_sp_ids", secondaries)
                    .with("removed", removed),
            )
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let reader = MetadataReader::new(Arc::new(store));
        let ids = |gvgs: Vec<GlobalVirtualGroup>| {
            gvgs.into_iter()
                .map(|g| g.global_virtual_group_id)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            ids(reader.list_global_virtual_groups_by_secondary_sp(2).await.unwrap()),
            vec![1]
        );
        assert_eq!(
            ids(reader.list_global_virtual_groups_by_secondary_sp(12).await.unwrap()),
            vec![1, 2]
        );
        assert_eq!(
            ids(reader.list_global_virtual_groups_by_primary_sp(1).await.unwrap()),
            vec![1]
        );
        assert_eq!(
            ids(reader.list_global_virtual_groups_by_family_id(7).await.unwrap()),
            vec![1, 2]
        );
        assert!(reader
            .get_global_virtual_group_by_id(3)
            .await
            .unwrap()
            .is_none());
    }
}
