// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Bucket name to physical table resolution.
//!
//! Objects and prefix-tree nodes are spread over [`NUMBER_OF_SHARDS`] tables
//! each. The shard of a bucket is `murmur3_32(bucket_name, seed = 0) mod 64`,
//! which every reader and writer of the schema must agree on.

use std::io::Cursor;

/// Number of physical tables per sharded entity.
pub const NUMBER_OF_SHARDS: u32 = 64;

pub const OBJECTS_TABLE_PREFIX: &str = "objects";
pub const PREFIX_TREE_TABLE_PREFIX: &str = "slash_prefix_tree_nodes";

/// MurmurHash3 (x86, 32 bit) of `data` with a zero seed.
pub fn murmur3_32(data: &[u8]) -> u32 {
    // Reading from an in-memory cursor cannot fail
    murmur3::murmur3_32(&mut Cursor::new(data), 0).unwrap_or_default()
}

/// Shard index in `[0, NUMBER_OF_SHARDS)` of the given bucket.
pub fn shard_of(bucket_name: &str) -> u32 {
    murmur3_32(bucket_name.as_bytes()) % NUMBER_OF_SHARDS
}

/// Name of the objects table holding the rows of `bucket_name`.
pub fn table_of(bucket_name: &str) -> String {
    objects_table(shard_of(bucket_name))
}

/// Name of the prefix-tree table holding the nodes of `bucket_name`.
pub fn prefix_table_of(bucket_name: &str) -> String {
    prefix_tree_table(shard_of(bucket_name))
}

pub fn objects_table(shard: u32) -> String {
    format!("{OBJECTS_TABLE_PREFIX}_{shard:02}")
}

pub fn prefix_tree_table(shard: u32) -> String {
    format!("{PREFIX_TREE_TABLE_PREFIX}_{shard:02}")
}

/// Iterate over every objects table name.
pub fn all_objects_tables() -> impl Iterator<Item = String> {
    (0..NUMBER_OF_SHARDS).map(objects_table)
}

/// Iterate over every prefix-tree table name.
pub fn all_prefix_tree_tables() -> impl Iterator<Item = String> {
    (0..NUMBER_OF_SHARDS).map(prefix_tree_table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmur3_reference_vectors() {
        assert_eq!(murmur3_32(b""), 0);
        assert_eq!(murmur3_32(b"hello"), 0x248bfa47);
        assert_eq!(murmur3_32(b"alpha"), 0xa9c0133d);
        assert_eq!(murmur3_32(b"beta"), 0x789069a9);
    }

    #[test]
    fn test_shard_of_known_buckets() {
        assert_eq!(shard_of("alpha"), 61);
        assert_eq!(shard_of("beta"), 41);
        assert_eq!(shard_of("b"), 3);
        assert_eq!(table_of("alpha"), "objects_61");
        assert_eq!(table_of("beta"), "objects_41");
        assert_ne!(table_of("alpha"), table_of("beta"));
    }

    #[test]
    fn test_table_names_are_zero_padded() {
        assert_eq!(objects_table(0), "objects_00");
        assert_eq!(objects_table(7), "objects_07");
        assert_eq!(prefix_tree_table(63), "slash_prefix_tree_nodes_63");
        assert_eq!(prefix_table_of("b"), "slash_prefix_tree_nodes_03");
    }

    #[test]
    fn test_all_tables_cover_every_shard() {
        let tables: Vec<_> = all_objects_tables().collect();
        assert_eq!(tables.len(), NUMBER_OF_SHARDS as usize);
        assert_eq!(tables.first().map(String::as_str), Some("objects_00"));
        assert_eq!(tables.last().map(String::as_str), Some("objects_63"));
    }

    #[test]
    fn test_shard_is_stable_and_bounded() {
        for name in ["", "a", "bucket-1", "x".repeat(64).as_str()] {
            let shard = shard_of(name);
            assert!(shard < NUMBER_OF_SHARDS);
            assert_eq!(shard, shard_of(name));
        }
    }
}
