// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Schema management for the catalog tables.

use sqlx::MySqlPool;
use tracing::{debug, info};

use crate::catalog::TableDef;
use crate::DbError;

/// Quote an identifier for MySQL. Some table names (`groups`) are reserved
/// words.
pub fn quote(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Manages SQL schema creation for catalog tables.
pub struct SchemaManager;

impl SchemaManager {
    /// Ensure a table and its indexes exist.
    ///
    /// MySQL has no `CREATE INDEX IF NOT EXISTS`, so indexes are declared
    /// inline and the whole statement stays idempotent.
    pub async fn ensure_table(
        pool: &MySqlPool,
        table: &TableDef,
    ) -> Result<(), DbError> {
        let create_table_sql = Self::generate_create_table(table)?;

        debug!("Creating table if not exists: {}", table.name);
        debug!("SQL: {}", create_table_sql);

        sqlx::query(&create_table_sql).execute(pool).await?;

        info!("Ensured table '{}' exists", table.name);
        Ok(())
    }

    /// Generate the `CREATE TABLE IF NOT EXISTS` statement of a table.
    pub fn generate_create_table(table: &TableDef) -> Result<String, DbError> {
        if table.columns.is_empty() {
            return Err(DbError::Schema(format!(
                "table {} must have at least one column",
                table.name
            )));
        }
        if table.primary_key.is_empty() {
            return Err(DbError::Schema(format!(
                "table {} must have a primary key",
                table.name
            )));
        }

        let mut sql =
            format!("CREATE TABLE IF NOT EXISTS {} (\n", quote(&table.name));

        let mut defs = Vec::new();
        for col in &table.columns {
            let mut def = format!("    {} {}", quote(col.name), col.col_type.sql());
            if col.auto_increment {
                def.push_str(" NOT NULL AUTO_INCREMENT");
            } else if let Some(default) = col.col_type.default_sql() {
                def.push_str(" NOT NULL DEFAULT ");
                def.push_str(default);
            } else {
                def.push_str(" NULL");
            }
            defs.push(def);
        }

        defs.push(format!(
            "    PRIMARY KEY ({})",
            Self::column_list(&table.primary_key)
        ));

        for index in &table.indexes {
            if index.columns.is_empty() {
                return Err(DbError::Schema(format!(
                    "index {} must have at least one column",
                    index.name
                )));
            }
            let kind = if index.unique { "UNIQUE KEY" } else { "KEY" };
            let columns = index
                .columns
                .iter()
                .map(|c| match index.prefix_length(c) {
                    Some(len) => format!("{}({len})", quote(c)),
                    None => quote(c),
                })
                .collect::<Vec<_>>()
                .join(", ");
            defs.push(format!("    {kind} {} ({columns})", quote(index.name)));
        }

        sql.push_str(&defs.join(",\n"));
        sql.push_str(
            "\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_bin",
        );

        Ok(sql)
    }

    fn column_list(columns: &[&str]) -> String {
        columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_generate_create_table() {
        let def = catalog::table(catalog::OBJECT_ID_MAP).unwrap();
        let sql = SchemaManager::generate_create_table(def).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `object_id_map` (\n    \
             `object_id` VARCHAR(66) NOT NULL DEFAULT '',\n    \
             `bucket_name` VARCHAR(64) NOT NULL DEFAULT '',\n    \
             PRIMARY KEY (`object_id`)\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_bin"
        );
    }

    #[test]
    fn test_generate_create_table_with_indexes() {
        let def = catalog::table(catalog::GROUPS).unwrap();
        let sql = SchemaManager::generate_create_table(def).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `groups` ("));
        assert!(sql.contains("`id` BIGINT NOT NULL AUTO_INCREMENT"));
        assert!(sql.contains("`removed` BOOLEAN NOT NULL DEFAULT 0"));
        assert!(sql.contains("PRIMARY KEY (`id`)"));
        assert!(sql.contains(
            "UNIQUE KEY `uk_group_account` (`group_id`, `account_id`)"
        ));
        assert!(sql.contains("KEY `idx_owner` (`owner`)"));
    }

    #[test]
    fn test_prefix_tree_indexes() {
        let def = catalog::table("slash_prefix_tree_nodes_09").unwrap();
        let sql = SchemaManager::generate_create_table(def).unwrap();
        assert!(sql.contains("`full_name` VARCHAR(1024) NOT NULL DEFAULT ''"));
        assert!(sql.contains(
            "UNIQUE KEY `uk_bucket_full_object` \
             (`bucket_name`, `full_name_hash`, `is_object`)"
        ));
        assert!(sql.contains(
            "KEY `idx_bucket_path` (`bucket_name`, `path_name`(512))"
        ));
    }

    #[test]
    fn test_nullable_text_columns() {
        let def = catalog::table("objects_05").unwrap();
        let sql = SchemaManager::generate_create_table(def).unwrap();
        assert!(sql.contains("`checksums` TEXT NULL"));
        assert!(sql.contains("`payload_size` BIGINT NOT NULL DEFAULT 0"));
    }

    #[test]
    fn test_every_catalog_table_renders() {
        for def in catalog::all_tables() {
            assert!(SchemaManager::generate_create_table(&def).is_ok());
        }
    }

    #[test]
    fn test_quote_escapes_backticks() {
        assert_eq!(quote("groups"), "`groups`");
        assert_eq!(quote("a`b"), "`a``b`");
    }
}
