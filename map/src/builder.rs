use bytes::Bytes;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::hashing::{HashAlgorithm, MapKey, HASH_LEN};
use crate::leaf::LeafEntry;
use crate::proto::{Tile, TileLeaf};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("{0} prefix strata don't fit into {}-byte keys", HASH_LEN)]
    InvalidStrata(u8),

    #[error("duplicate leaf at key {0}")]
    DuplicateKey(MapKey),
}

/// Turns a complete set of leaves into the tiles of a map.
///
/// Builders see the whole leaf set at once and are not incremental.
/// Any error aborts the run, partial tile sets are never persisted.
pub trait MapBuilder: Send + Sync {
    fn build(
        &self,
        tree_id: i64,
        hash_algorithm: HashAlgorithm,
        prefix_strata: u8,
        leaves: Vec<LeafEntry>,
    ) -> Result<Vec<Tile>, BuildError>;
}

/// Buckets leaves into one tile per key prefix of `prefix_strata` bytes.
///
/// Inside a tile, leaves are addressed by the rest of their key and sorted.
/// This computes no interior nodes, it only gives the pipeline a
/// deterministic tile layout to persist. As leaf values arrive already
/// hashed, `tree_id` and `hash_algorithm` don't influence the tiles and are
/// only recorded on the span.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefixTileBuilder;

impl MapBuilder for PrefixTileBuilder {
    #[instrument(skip(self, leaves), fields(leaves.len = leaves.len()), err)]
    fn build(
        &self,
        tree_id: i64,
        hash_algorithm: HashAlgorithm,
        prefix_strata: u8,
        mut leaves: Vec<LeafEntry>,
    ) -> Result<Vec<Tile>, BuildError> {
        let prefix_len = prefix_strata as usize;
        if prefix_len >= HASH_LEN {
            return Err(BuildError::InvalidStrata(prefix_strata));
        }

        leaves.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        if let Some(dup) = leaves.windows(2).find(|w| w[0].key == w[1].key) {
            return Err(BuildError::DuplicateKey(dup[0].key));
        }

        let mut tiles: BTreeMap<&[u8], Vec<TileLeaf>> = BTreeMap::new();
        for leaf in &leaves {
            let (prefix, suffix) = leaf.key.as_slice().split_at(prefix_len);
            tiles.entry(prefix).or_default().push(TileLeaf {
                path: Bytes::copy_from_slice(suffix),
                hash: Bytes::copy_from_slice(&leaf.value),
            });
        }

        debug!(tiles.len = tiles.len(), "bucketed leaves");

        Ok(tiles
            .into_iter()
            .map(|(prefix, leaves)| Tile {
                path: Bytes::copy_from_slice(prefix),
                leaves,
            })
            .collect())
    }
}
