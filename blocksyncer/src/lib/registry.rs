// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Handler modules and the registry routing events to them.

use std::collections::HashMap;

use async_trait::async_trait;
use bsdb::catalog::{self, TableDef, EPOCH, MASTER_DB, DATA_MIGRATION_RECORD};
use bsdb::{Lookup, RowMutation, Store, StoreTx};
use tracing::info;

use crate::context::BlockContext;
use crate::error::SyncError;
use crate::events::Event;

/// A handler computing the mutations of an event from a read-only view of
/// the block transaction.
#[async_trait]
pub trait Extract: Send + Sync {
    async fn extract(
        &self,
        ctx: &BlockContext,
        lookup: &mut dyn Lookup,
        event: &Event,
    ) -> Result<Vec<RowMutation>, SyncError>;
}

/// A handler writing through the block transaction itself, for work that
/// interleaves reads and writes.
#[async_trait]
pub trait Direct: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut BlockContext,
        tx: &mut dyn StoreTx,
        event: &Event,
    ) -> Result<(), SyncError>;
}

pub enum Handler<'a> {
    Extract(&'a dyn Extract),
    Direct(&'a dyn Direct),
}

/// A unit of indexing: the events it consumes, the tables it owns and how
/// it turns the former into rows of the latter.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    /// Full proto names of the events routed to this module.
    fn interested_events(&self) -> &'static [&'static str];

    /// Tables written by the module.
    fn tables(&self) -> Result<Vec<TableDef>, SyncError>;

    fn handler(&self) -> Handler<'_>;

    /// Create the module's tables if missing.
    async fn prepare_tables(&self, store: &dyn Store) -> Result<(), SyncError> {
        store.ensure_tables(&self.tables()?).await?;
        Ok(())
    }
}

/// Apply `mutation` to the block transaction, counting it in the block
/// statistics.
pub async fn apply(
    ctx: &mut BlockContext,
    tx: &mut dyn StoreTx,
    mutation: &RowMutation,
) -> Result<u64, SyncError> {
    let affected = tx.apply(mutation).await?;
    ctx.stats.mutations += 1;
    Ok(affected)
}

/// Catalog tables of `names`. An unknown name fails table preparation at
/// boot.
pub fn catalog_tables(names: &[&str]) -> Result<Vec<TableDef>, SyncError> {
    catalog::tables(names).map_err(SyncError::HandlerInternal)
}

/// Modules in registration order, indexed by the events they want.
#[derive(Default)]
pub struct Registry {
    modules: Vec<Box<dyn Module>>,
    routes: HashMap<&'static str, Vec<usize>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, module: impl Module + 'static) -> Self {
        let index = self.modules.len();
        for event in module.interested_events() {
            self.routes.entry(*event).or_default().push(index);
        }
        self.modules.push(Box::new(module));
        self
    }

    /// Modules interested in `event_type`, in registration order.
    pub fn modules_for(&self, event_type: &str) -> Vec<&dyn Module> {
        self.routes
            .get(event_type)
            .map(|indexes| {
                indexes.iter().map(|i| self.modules[*i].as_ref()).collect()
            })
            .unwrap_or_default()
    }

    pub fn is_interested(&self, event_type: &str) -> bool {
        self.routes.contains_key(event_type)
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Create the syncer's own tables and those of every module.
    pub async fn prepare_tables(
        &self,
        store: &dyn Store,
    ) -> Result<(), SyncError> {
        let own = catalog_tables(&[EPOCH, MASTER_DB, DATA_MIGRATION_RECORD])?;
        store.ensure_tables(&own).await?;
        for module in &self.modules {
            module.prepare_tables(store).await?;
            info!("Prepared tables of module {}", module.name());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsdb::catalog::BUCKETS;

    struct Noop(
        &'static str,
        &'static [&'static str],
        &'static [&'static str],
    );

    #[async_trait]
    impl Extract for Noop {
        async fn extract(
            &self,
            _ctx: &BlockContext,
            _lookup: &mut dyn Lookup,
            _event: &Event,
        ) -> Result<Vec<RowMutation>, SyncError> {
            Ok(vec![])
        }
    }

    impl Module for Noop {
        fn name(&self) -> &'static str {
            self.0
        }

        fn interested_events(&self) -> &'static [&'static str] {
            self.1
        }

        fn tables(&self) -> Result<Vec<TableDef>, SyncError> {
            catalog_tables(self.2)
        }

        fn handler(&self) -> Handler<'_> {
            Handler::Extract(self)
        }
    }

    #[test]
    fn test_routes_keep_registration_order() {
        let registry = Registry::new()
            .register(Noop("first", &["a", "b"], &[BUCKETS]))
            .register(Noop("second", &["b"], &[BUCKETS]));
        let names = |event| {
            registry
                .modules_for(event)
                .iter()
                .map(|m| m.name())
                .collect::<Vec<_>>()
        };
        assert_eq!(names("a"), vec!["first"]);
        assert_eq!(names("b"), vec!["first", "second"]);
        assert!(names("c").is_empty());
        assert!(!registry.is_interested("c"));
    }

    #[test]
    fn test_unknown_table_is_an_error() {
        assert!(matches!(
            catalog_tables(&["nope"]),
            Err(SyncError::HandlerInternal(_))
        ));
        assert_eq!(catalog_tables(&[BUCKETS]).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_module_table_fails_preparation() {
        let store = bsdb::MemoryStore::new();
        let registry = Registry::new()
            .register(Noop("good", &["a"], &[BUCKETS]))
            .register(Noop("bad", &["b"], &[BUCKETS, "nope"]));
        let err = registry.prepare_tables(&store).await.unwrap_err();
        assert!(err.to_string().contains("nope"), "{err}");
    }
}
