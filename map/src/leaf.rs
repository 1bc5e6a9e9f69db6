use rayon::prelude::*;
use sumdb_mapdb::InputRecord;

use crate::hashing::{hash_leaf, MapKey, HASH_LEN};

/// A keyed leaf of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeafEntry {
    pub key: MapKey,
    pub value: [u8; HASH_LEN],
}

/// Derives the two leaves of a module version, in order:
/// - the go.mod leaf, keyed by `H("<module> <version>/go.mod")` and bound to
///   the go.mod hash,
/// - the repository leaf, keyed by `H("<module> <version>")` and bound to the
///   repository hash.
pub fn derive_leaves(tree_id: i64, record: &InputRecord) -> [LeafEntry; 2] {
    let mod_key = MapKey::for_bytes(format!("{} {}/go.mod", record.module, record.version));
    let repo_key = MapKey::for_bytes(format!("{} {}", record.module, record.version));

    [
        LeafEntry {
            key: mod_key,
            value: hash_leaf(tree_id, &mod_key, record.mod_hash.as_bytes()),
        },
        LeafEntry {
            key: repo_key,
            value: hash_leaf(tree_id, &repo_key, record.repo_hash.as_bytes()),
        },
    ]
}

/// Derives the leaves of all records, in parallel.
/// The output keeps the record order, two leaves per record.
pub fn derive_all(tree_id: i64, records: &[InputRecord]) -> Vec<LeafEntry> {
    records
        .par_iter()
        .flat_map_iter(|record| derive_leaves(tree_id, record))
        .collect()
}
