// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Table catalog shared by the writer and the reader.
//!
//! Every table the syncer touches is declared here, together with its
//! columns, primary key and indexes. Table names are exposed as constants
//! (or, for sharded tables, through [`crate::shard`]) and must not be spelled
//! anywhere else.
//!
//! Adding a column is a forward compatible change: readers only select the
//! columns they know and writers only set the columns they have a value for.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::shard;
use crate::value::Value;

pub const BUCKETS: &str = "buckets";
pub const OBJECT_ID_MAP: &str = "object_id_map";
pub const GROUPS: &str = "groups";
pub const PERMISSION: &str = "permission";
pub const STATEMENTS: &str = "statements";
pub const STREAM_RECORDS: &str = "stream_records";
pub const PAYMENT_ACCOUNTS: &str = "payment_accounts";
pub const STORAGE_PROVIDERS: &str = "storage_providers";
pub const GLOBAL_VIRTUAL_GROUP: &str = "global_virtual_group";
pub const LOCAL_VIRTUAL_GROUP: &str = "local_virtual_group";
pub const GLOBAL_VIRTUAL_GROUP_FAMILIES: &str =
    "global_virtual_group_families";
pub const EPOCH: &str = "epoch";
pub const MASTER_DB: &str = "master_db";
pub const DATA_MIGRATION_RECORD: &str = "data_migration_record";

pub const EVENT_MIGRATION_BUCKET: &str = "event_migration_bucket";
pub const EVENT_COMPLETE_MIGRATION_BUCKET: &str =
    "event_complete_migration_bucket";
pub const EVENT_CANCEL_MIGRATION_BUCKET: &str = "event_cancel_migration_bucket";
pub const EVENT_REJECT_MIGRATE_BUCKET: &str = "event_reject_migrate_bucket";
pub const EVENT_SWAP_OUT: &str = "event_swap_out";
pub const EVENT_COMPLETE_SWAP_OUT: &str = "event_complete_swap_out";
pub const EVENT_CANCEL_SWAP_OUT: &str = "event_cancel_swap_out";
pub const EVENT_STORAGE_PROVIDER_EXIT: &str = "event_storage_provider_exit";
pub const EVENT_COMPLETE_STORAGE_PROVIDER_EXIT: &str =
    "event_complete_storage_provider_exit";

/// Unique key of every append-only audit table.
pub const AUDIT_KEYS: [&str; 2] = ["create_tx_hash", "event_index"];

/// SQL column types used by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Signed 64 bit integer: heights, unix seconds, sizes, small ids.
    BigInt,
    Bool,
    /// `0x` prefixed 32 byte hex identifier.
    Hash,
    /// `0x` prefixed 20 byte hex address.
    Address,
    /// Big integer kept exactly as its decimal text.
    Decimal,
    VarChar(u16),
    /// Unbounded text, nullable.
    Text,
}

impl ColumnType {
    /// The MySQL type declaration.
    pub fn sql(&self) -> String {
        match self {
            ColumnType::BigInt => "BIGINT".into(),
            ColumnType::Bool => "BOOLEAN".into(),
            ColumnType::Hash => "VARCHAR(66)".into(),
            ColumnType::Address => "VARCHAR(42)".into(),
            ColumnType::Decimal => "VARCHAR(80)".into(),
            ColumnType::VarChar(n) => format!("VARCHAR({n})"),
            ColumnType::Text => "TEXT".into(),
        }
    }

    /// Value stored when a writer does not set the column.
    pub fn default_value(&self) -> Value {
        match self {
            ColumnType::BigInt => Value::Int(0),
            ColumnType::Bool => Value::Bool(false),
            ColumnType::Decimal => Value::Text("0".into()),
            ColumnType::Hash | ColumnType::Address | ColumnType::VarChar(_) => {
                Value::Text(String::new())
            }
            ColumnType::Text => Value::Null,
        }
    }

    /// SQL literal of [`Self::default_value`], `None` for nullable types.
    pub fn default_sql(&self) -> Option<&'static str> {
        match self {
            ColumnType::BigInt | ColumnType::Bool => Some("0"),
            ColumnType::Decimal => Some("'0'"),
            ColumnType::Hash | ColumnType::Address | ColumnType::VarChar(_) => {
                Some("''")
            }
            ColumnType::Text => None,
        }
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub auto_increment: bool,
}

/// An index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    pub columns: Vec<&'static str>,
    pub unique: bool,
    /// Columns indexed on their first characters only. Never set on unique
    /// indexes.
    pub prefix_lengths: Vec<(&'static str, u16)>,
}

impl IndexDef {
    /// Indexed length of `column`, `None` when the whole value is indexed.
    pub fn prefix_length(&self, column: &str) -> Option<u16> {
        self.prefix_lengths
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, len)| *len)
    }
}

/// InnoDB limit on the byte size of an index key.
pub const MAX_INDEX_KEY_BYTES: usize = 3072;

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<&'static str>,
    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: vec![],
            primary_key: vec![],
            indexes: vec![],
        }
    }

    /// Surrogate auto-increment primary key.
    fn with_id(mut self) -> Self {
        self.columns.push(ColumnDef {
            name: "id",
            col_type: ColumnType::BigInt,
            auto_increment: true,
        });
        self.primary_key = vec!["id"];
        self
    }

    fn col(mut self, name: &'static str, col_type: ColumnType) -> Self {
        self.columns.push(ColumnDef {
            name,
            col_type,
            auto_increment: false,
        });
        self
    }

    fn primary(mut self, columns: &[&'static str]) -> Self {
        self.primary_key = columns.to_vec();
        self
    }

    fn unique(mut self, name: &'static str, columns: &[&'static str]) -> Self {
        self.indexes.push(IndexDef {
            name,
            columns: columns.to_vec(),
            unique: true,
            prefix_lengths: vec![],
        });
        self
    }

    fn index(mut self, name: &'static str, columns: &[&'static str]) -> Self {
        self.indexes.push(IndexDef {
            name,
            columns: columns.to_vec(),
            unique: false,
            prefix_lengths: vec![],
        });
        self
    }

    /// Secondary index over the first `len` characters of `column`.
    fn index_prefix(
        mut self,
        name: &'static str,
        columns: &[&'static str],
        column: &'static str,
        len: u16,
    ) -> Self {
        self.indexes.push(IndexDef {
            name,
            columns: columns.to_vec(),
            unique: false,
            prefix_lengths: vec![(column, len)],
        });
        self
    }

    /// Block height, tx hash and unix time of creation and last update.
    fn tracked(self) -> Self {
        self.col("create_at", ColumnType::BigInt)
            .col("create_tx_hash", ColumnType::Hash)
            .col("create_time", ColumnType::BigInt)
            .col("update_at", ColumnType::BigInt)
            .col("update_tx_hash", ColumnType::Hash)
            .col("update_time", ColumnType::BigInt)
    }

    /// Columns shared by the append-only audit tables.
    fn audited(self) -> Self {
        self.with_id()
            .col("create_at", ColumnType::BigInt)
            .col("create_tx_hash", ColumnType::Hash)
            .col("create_time", ColumnType::BigInt)
            .col("event_index", ColumnType::BigInt)
            .unique("uk_tx_event", &AUDIT_KEYS)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Column sets that must be unique: the primary key and every unique
    /// index.
    pub fn unique_keys(&self) -> Vec<Vec<&'static str>> {
        let mut keys = vec![self.primary_key.clone()];
        keys.extend(
            self.indexes
                .iter()
                .filter(|i| i.unique)
                .map(|i| i.columns.clone()),
        );
        keys
    }

    /// Name of the auto-increment column, if any.
    pub fn auto_increment(&self) -> Option<&'static str> {
        self.columns.iter().find(|c| c.auto_increment).map(|c| c.name)
    }
}

use ColumnType::*;

fn buckets() -> TableDef {
    TableDef::new(BUCKETS)
        .with_id()
        .col("bucket_id", Hash)
        .col("bucket_name", VarChar(64))
        .col("owner", Address)
        .col("operator", Address)
        .col("payment_address", Address)
        .col("global_virtual_group_family_id", BigInt)
        .col("visibility", VarChar(64))
        .col("status", VarChar(64))
        .col("source_type", VarChar(64))
        .col("charged_read_quota", BigInt)
        .col("delete_reason", VarChar(256))
        .col("delete_at", BigInt)
        .col("off_chain_status", BigInt)
        .col("storage_size", Decimal)
        .col("charge_size", Decimal)
        .col("removed", Bool)
        .tracked()
        .unique("uk_bucket_id", &["bucket_id"])
        .unique("uk_bucket_name", &["bucket_name"])
        .index("idx_owner", &["owner"])
        .index("idx_family", &["global_virtual_group_family_id"])
}

fn objects(shard: u32) -> TableDef {
    TableDef::new(shard::objects_table(shard))
        .with_id()
        .col("object_id", Hash)
        .col("bucket_id", Hash)
        .col("bucket_name", VarChar(64))
        .col("object_name", VarChar(1024))
        .col("owner", Address)
        .col("creator", Address)
        .col("operator", Address)
        .col("updater", Address)
        .col("local_virtual_group_id", BigInt)
        .col("payload_size", BigInt)
        .col("visibility", VarChar(64))
        .col("content_type", VarChar(128))
        .col("status", VarChar(64))
        .col("redundancy_type", VarChar(64))
        .col("source_type", VarChar(64))
        .col("checksums", Text)
        .col("sealed_tx_hash", Hash)
        .col("delete_reason", VarChar(256))
        .col("delete_at", BigInt)
        .col("is_updating", Bool)
        .col("content_updated_time", BigInt)
        .col("version", BigInt)
        .col("removed", Bool)
        .tracked()
        .unique("uk_object_id", &["object_id"])
        .index("idx_bucket_name", &["bucket_name"])
        .index("idx_update_at", &["update_at"])
}

fn object_id_map() -> TableDef {
    TableDef::new(OBJECT_ID_MAP)
        .col("object_id", Hash)
        .col("bucket_name", VarChar(64))
        .primary(&["object_id"])
}

fn groups() -> TableDef {
    TableDef::new(GROUPS)
        .with_id()
        .col("group_id", Hash)
        .col("account_id", Address)
        .col("group_name", VarChar(64))
        .col("owner", Address)
        .col("operator", Address)
        .col("source_type", VarChar(64))
        .col("extra", VarChar(512))
        .col("expiration_time", BigInt)
        .col("removed", Bool)
        .tracked()
        .unique("uk_group_account", &["group_id", "account_id"])
        .index("idx_account", &["account_id"])
        .index("idx_owner", &["owner"])
}

fn permission() -> TableDef {
    TableDef::new(PERMISSION)
        .with_id()
        .col("principal_type", BigInt)
        .col("principal_value", VarChar(128))
        .col("resource_type", VarChar(64))
        .col("resource_id", Hash)
        .col("policy_id", Hash)
        .col("create_timestamp", BigInt)
        .col("update_timestamp", BigInt)
        .col("expiration_time", BigInt)
        .col("removed", Bool)
        .unique(
            "uk_resource_principal",
            &[
                "resource_type",
                "resource_id",
                "principal_type",
                "principal_value",
            ],
        )
        .index("idx_policy_id", &["policy_id"])
}

fn statements() -> TableDef {
    TableDef::new(STATEMENTS)
        .with_id()
        .col("policy_id", Hash)
        .col("statement_index", BigInt)
        .col("effect", VarChar(32))
        .col("action_value", BigInt)
        .col("resources", Text)
        .col("expiration_time", BigInt)
        .col("limit_size", BigInt)
        .col("removed", Bool)
        .unique("uk_policy_statement", &["policy_id", "statement_index"])
}

fn stream_records() -> TableDef {
    TableDef::new(STREAM_RECORDS)
        .with_id()
        .col("account", Address)
        .col("crud_timestamp", BigInt)
        .col("netflow_rate", Decimal)
        .col("frozen_netflow_rate", Decimal)
        .col("static_balance", Decimal)
        .col("buffer_balance", Decimal)
        .col("lock_balance", Decimal)
        .col("status", VarChar(32))
        .col("settle_timestamp", BigInt)
        .col("out_flow_count", BigInt)
        .col("update_at", BigInt)
        .col("update_time", BigInt)
        .unique("uk_account", &["account"])
}

fn payment_accounts() -> TableDef {
    TableDef::new(PAYMENT_ACCOUNTS)
        .with_id()
        .col("addr", Address)
        .col("owner", Address)
        .col("refundable", Bool)
        .col("update_at", BigInt)
        .col("update_time", BigInt)
        .unique("uk_addr", &["addr"])
        .index("idx_owner", &["owner"])
}

fn storage_providers() -> TableDef {
    TableDef::new(STORAGE_PROVIDERS)
        .with_id()
        .col("sp_id", BigInt)
        .col("operator_address", Address)
        .col("funding_address", Address)
        .col("seal_address", Address)
        .col("approval_address", Address)
        .col("gc_address", Address)
        .col("bls_key", VarChar(256))
        .col("total_deposit", Decimal)
        .col("status", VarChar(64))
        .col("endpoint", VarChar(256))
        .col("moniker", VarChar(128))
        .col("identity", VarChar(128))
        .col("website", VarChar(256))
        .col("security_contact", VarChar(256))
        .col("details", Text)
        .col("read_price", Decimal)
        .col("free_read_quota", BigInt)
        .col("store_price", Decimal)
        .col("price_update_time", BigInt)
        .col("removed", Bool)
        .tracked()
        .unique("uk_sp_id", &["sp_id"])
        .unique("uk_operator_address", &["operator_address"])
}

fn global_virtual_group() -> TableDef {
    TableDef::new(GLOBAL_VIRTUAL_GROUP)
        .with_id()
        .col("global_virtual_group_id", BigInt)
        .col("family_id", BigInt)
        .col("primary_sp_id", BigInt)
        .col("secondary_sp_ids", VarChar(1024))
        .col("stored_size", BigInt)
        .col("virtual_payment_address", Address)
        .col("total_deposit", Decimal)
        .col("removed", Bool)
        .tracked()
        .unique("uk_gvg_id", &["global_virtual_group_id"])
        .index("idx_family_id", &["family_id"])
        .index("idx_primary_sp_id", &["primary_sp_id"])
}

fn local_virtual_group() -> TableDef {
    TableDef::new(LOCAL_VIRTUAL_GROUP)
        .with_id()
        .col("local_virtual_group_id", BigInt)
        .col("bucket_id", Hash)
        .col("global_virtual_group_id", BigInt)
        .col("stored_size", BigInt)
        .col("removed", Bool)
        .tracked()
        .unique("uk_lvg_bucket", &["local_virtual_group_id", "bucket_id"])
        .index("idx_gvg_id", &["global_virtual_group_id"])
}

fn global_virtual_group_families() -> TableDef {
    TableDef::new(GLOBAL_VIRTUAL_GROUP_FAMILIES)
        .with_id()
        .col("global_virtual_group_family_id", BigInt)
        .col("primary_sp_id", BigInt)
        .col("global_virtual_group_ids", VarChar(2048))
        .col("virtual_payment_address", Address)
        .col("removed", Bool)
        .tracked()
        .unique("uk_family_id", &["global_virtual_group_family_id"])
        .index("idx_primary_sp_id", &["primary_sp_id"])
}

/// Names are as long as object names, too long for a unique key, so nodes
/// are unique by the hash of their full name.
fn prefix_tree_nodes(shard: u32) -> TableDef {
    TableDef::new(shard::prefix_tree_table(shard))
        .with_id()
        .col("bucket_name", VarChar(64))
        .col("path_name", VarChar(1024))
        .col("full_name", VarChar(1024))
        .col("full_name_hash", Hash)
        .col("name", VarChar(1024))
        .col("is_object", Bool)
        .col("is_folder", Bool)
        .col("object_id", Hash)
        .col("object_name", VarChar(1024))
        .unique(
            "uk_bucket_full_object",
            &["bucket_name", "full_name_hash", "is_object"],
        )
        .index_prefix(
            "idx_bucket_path",
            &["bucket_name", "path_name"],
            "path_name",
            512,
        )
        .index("idx_object_id", &["object_id"])
}

fn epoch() -> TableDef {
    TableDef::new(EPOCH)
        .col("one_row_id", Bool)
        .col("block_height", BigInt)
        .col("block_hash", Hash)
        .col("update_time", BigInt)
        .primary(&["one_row_id"])
}

fn master_db() -> TableDef {
    TableDef::new(MASTER_DB)
        .col("one_row_id", Bool)
        .col("is_master", Bool)
        .primary(&["one_row_id"])
}

fn data_migration_record() -> TableDef {
    TableDef::new(DATA_MIGRATION_RECORD)
        .col("process_key", VarChar(128))
        .col("is_completed", Bool)
        .primary(&["process_key"])
}

fn event_migration_bucket() -> TableDef {
    TableDef::new(EVENT_MIGRATION_BUCKET)
        .audited()
        .col("bucket_id", Hash)
        .col("bucket_name", VarChar(64))
        .col("operator", Address)
        .col("dst_primary_sp_id", BigInt)
}

fn event_complete_migration_bucket() -> TableDef {
    TableDef::new(EVENT_COMPLETE_MIGRATION_BUCKET)
        .audited()
        .col("bucket_id", Hash)
        .col("bucket_name", VarChar(64))
        .col("operator", Address)
        .col("global_virtual_group_family_id", BigInt)
        .col("src_primary_sp_id", BigInt)
}

fn event_cancel_migration_bucket() -> TableDef {
    TableDef::new(EVENT_CANCEL_MIGRATION_BUCKET)
        .audited()
        .col("bucket_id", Hash)
        .col("bucket_name", VarChar(64))
        .col("operator", Address)
}

fn event_reject_migrate_bucket() -> TableDef {
    TableDef::new(EVENT_REJECT_MIGRATE_BUCKET)
        .audited()
        .col("bucket_id", Hash)
        .col("bucket_name", VarChar(64))
        .col("operator", Address)
}

fn event_swap_out(name: &'static str) -> TableDef {
    TableDef::new(name)
        .audited()
        .col("storage_provider_id", BigInt)
        .col("global_virtual_group_family_id", BigInt)
        .col("global_virtual_group_ids", VarChar(2048))
        .col("successor_sp_id", BigInt)
}

fn event_complete_swap_out() -> TableDef {
    TableDef::new(EVENT_COMPLETE_SWAP_OUT)
        .audited()
        .col("storage_provider_id", BigInt)
        .col("src_storage_provider_id", BigInt)
        .col("global_virtual_group_family_id", BigInt)
        .col("global_virtual_group_ids", VarChar(2048))
}

fn event_storage_provider_exit() -> TableDef {
    TableDef::new(EVENT_STORAGE_PROVIDER_EXIT)
        .audited()
        .col("storage_provider_id", BigInt)
        .col("operator_address", Address)
}

fn event_complete_storage_provider_exit() -> TableDef {
    TableDef::new(EVENT_COMPLETE_STORAGE_PROVIDER_EXIT)
        .audited()
        .col("storage_provider_id", BigInt)
        .col("operator_address", Address)
        .col("total_deposit", Decimal)
}

/// Every table of the schema, sharded tables expanded.
pub fn all_tables() -> Vec<TableDef> {
    let mut tables = vec![
        buckets(),
        object_id_map(),
        groups(),
        permission(),
        statements(),
        stream_records(),
        payment_accounts(),
        storage_providers(),
        global_virtual_group(),
        local_virtual_group(),
        global_virtual_group_families(),
        epoch(),
        master_db(),
        data_migration_record(),
        event_migration_bucket(),
        event_complete_migration_bucket(),
        event_cancel_migration_bucket(),
        event_reject_migrate_bucket(),
        event_swap_out(EVENT_SWAP_OUT),
        event_complete_swap_out(),
        event_swap_out(EVENT_CANCEL_SWAP_OUT),
        event_storage_provider_exit(),
        event_complete_storage_provider_exit(),
    ];
    tables.extend((0..shard::NUMBER_OF_SHARDS).map(objects));
    tables.extend((0..shard::NUMBER_OF_SHARDS).map(prefix_tree_nodes));
    tables
}

static CATALOG: Lazy<HashMap<String, TableDef>> = Lazy::new(|| {
    all_tables()
        .into_iter()
        .map(|t| (t.name.clone(), t))
        .collect()
});

/// Look a table up by its physical name.
pub fn table(name: &str) -> Option<&'static TableDef> {
    CATALOG.get(name)
}

/// Definitions for the given table names, in order. Unknown names are
/// reported back as an error message.
pub fn tables(names: &[&str]) -> Result<Vec<TableDef>, String> {
    names
        .iter()
        .map(|n| table(n).cloned().ok_or_else(|| format!("unknown table {n}")))
        .collect()
}

/// Every objects shard definition.
pub fn objects_tables() -> Vec<TableDef> {
    (0..shard::NUMBER_OF_SHARDS).map(objects).collect()
}

/// Every prefix-tree shard definition.
pub fn prefix_tree_tables() -> Vec<TableDef> {
    (0..shard::NUMBER_OF_SHARDS).map(prefix_tree_nodes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_contains_every_table() {
        let tables = all_tables();
        assert_eq!(tables.len(), 23 + 2 * shard::NUMBER_OF_SHARDS as usize);
        for name in [BUCKETS, OBJECT_ID_MAP, EPOCH, MASTER_DB, GROUPS] {
            assert!(table(name).is_some(), "{name} missing");
        }
        assert!(table("objects_00").is_some());
        assert!(table("objects_63").is_some());
        assert!(table("objects_64").is_none());
        assert!(table("slash_prefix_tree_nodes_17").is_some());
    }

    #[test]
    fn test_table_names_are_unique() {
        let tables = all_tables();
        let names: std::collections::HashSet<_> =
            tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), tables.len());
    }

    #[test]
    fn test_every_table_has_a_primary_key_of_known_columns() {
        for t in all_tables() {
            assert!(!t.primary_key.is_empty(), "{} has no key", t.name);
            for key in t.unique_keys().into_iter().flatten() {
                assert!(t.column(key).is_some(), "{}.{key}", t.name);
            }
            for index in &t.indexes {
                for c in &index.columns {
                    assert!(t.column(c).is_some(), "{}.{c}", t.name);
                }
            }
        }
    }

    #[test]
    fn test_audit_tables_are_keyed_by_tx_and_event_index() {
        for name in [
            EVENT_MIGRATION_BUCKET,
            EVENT_SWAP_OUT,
            EVENT_CANCEL_SWAP_OUT,
            EVENT_COMPLETE_STORAGE_PROVIDER_EXIT,
        ] {
            let t = table(name).unwrap();
            assert!(t.unique_keys().contains(&AUDIT_KEYS.to_vec()));
            assert_eq!(t.auto_increment(), Some("id"));
        }
    }

    #[test]
    fn test_prefix_tree_unique_key() {
        let t = table("slash_prefix_tree_nodes_00").unwrap();
        assert!(t
            .unique_keys()
            .contains(&vec!["bucket_name", "full_name_hash", "is_object"]));
    }

    fn width(t: &TableDef, column: &str) -> u16 {
        match t.column(column).unwrap().col_type {
            VarChar(n) => n,
            other => panic!("{column} is {other:?}"),
        }
    }

    #[test]
    fn test_prefix_tree_holds_every_object_name() {
        let objects = table("objects_00").unwrap();
        let nodes = table("slash_prefix_tree_nodes_00").unwrap();
        let longest = width(objects, "object_name");
        for column in ["path_name", "full_name", "name", "object_name"] {
            assert!(width(nodes, column) >= longest, "{column}");
        }
    }

    /// utf8mb4 characters take up to 4 bytes in a key.
    fn key_bytes(t: &TableDef, index: &IndexDef) -> usize {
        index
            .columns
            .iter()
            .map(|c| {
                let chars = match index.prefix_length(c) {
                    Some(len) => len as usize,
                    None => match t.column(c).unwrap().col_type {
                        BigInt => return 8,
                        Bool => return 1,
                        Hash => 66,
                        Address => 42,
                        Decimal => 80,
                        VarChar(n) => n as usize,
                        Text => panic!("{}.{c} is not indexable", t.name),
                    },
                };
                chars * 4
            })
            .sum()
    }

    #[test]
    fn test_index_keys_fit_innodb() {
        for t in all_tables() {
            let mut names = std::collections::HashSet::new();
            for index in &t.indexes {
                assert!(names.insert(index.name), "{}.{}", t.name, index.name);
                assert!(
                    key_bytes(&t, index) <= MAX_INDEX_KEY_BYTES,
                    "{}.{} is too wide",
                    t.name,
                    index.name
                );
                if index.unique {
                    assert!(index.prefix_lengths.is_empty());
                }
            }
        }
    }
}
