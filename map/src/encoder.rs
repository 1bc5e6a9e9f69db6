use prost::Message;
use sumdb_mapdb::OutputRow;
use thiserror::Error;

use crate::hashing::HASH_LEN;
use crate::proto::Tile;

/// Upper bound for a single serialized tile.
pub const MAX_TILE_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("leaf {index} has a {len}-byte hash, expected {}", HASH_LEN)]
    InvalidLeafHash { index: usize, len: usize },

    #[error("tile is {0} bytes, exceeding the limit of {}", MAX_TILE_BYTES)]
    TooLarge(usize),

    #[error(transparent)]
    Encode(#[from] prost::EncodeError),
}

/// Serializes a tile into the row stored for it under `revision`.
///
/// The path is copied as is, the revision comes from the caller and never
/// from the tile.
pub fn encode_tile(tile: &Tile, revision: u64) -> Result<OutputRow, EncodeError> {
    encode_tile_with_limit(tile, revision, MAX_TILE_BYTES)
}

fn encode_tile_with_limit(
    tile: &Tile,
    revision: u64,
    limit: usize,
) -> Result<OutputRow, EncodeError> {
    if let Some((index, leaf)) = tile
        .leaves
        .iter()
        .enumerate()
        .find(|(_, leaf)| leaf.hash.len() != HASH_LEN)
    {
        return Err(EncodeError::InvalidLeafHash {
            index,
            len: leaf.hash.len(),
        });
    }

    let len = tile.encoded_len();
    if len > limit {
        return Err(EncodeError::TooLarge(len));
    }

    let mut buf = Vec::with_capacity(len);
    tile.encode(&mut buf)?;

    Ok(OutputRow {
        revision,
        path: tile.path.clone(),
        tile: buf.into(),
    })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use prost::Message;

    use super::{encode_tile, encode_tile_with_limit, EncodeError};
    use crate::proto::{Tile, TileLeaf};

    fn tile() -> Tile {
        Tile {
            path: Bytes::from_static(b"\x01\x02"),
            leaves: vec![
                TileLeaf {
                    path: Bytes::from(vec![0xaa; 30]),
                    hash: Bytes::from(vec![0x11; 32]),
                },
                TileLeaf {
                    path: Bytes::from(vec![0xbb; 30]),
                    hash: Bytes::from(vec![0x22; 32]),
                },
            ],
        }
    }

    #[test]
    fn stamps_revision_and_copies_path() {
        let row = encode_tile(&tile(), 42).expect("must encode");

        assert_eq!(42, row.revision);
        assert_eq!(tile().path, row.path);
        assert_eq!(tile(), Tile::decode(row.tile).expect("must decode"));
    }

    #[test]
    fn deterministic() {
        assert_eq!(
            encode_tile(&tile(), 0).unwrap().tile,
            encode_tile(&tile(), 0).unwrap().tile
        );
    }

    /// Revisions only go into the row, never into the serialized tile.
    #[test]
    fn content_independent_of_revision() {
        let a = encode_tile(&tile(), 0).unwrap();
        let b = encode_tile(&tile(), 1).unwrap();
        assert_eq!(a.tile, b.tile);
        assert_ne!(a.revision, b.revision);
    }

    #[test]
    fn reject_short_leaf_hash() {
        let mut tile = tile();
        tile.leaves[1].hash = Bytes::from_static(b"short");

        assert!(matches!(
            encode_tile(&tile, 0),
            Err(EncodeError::InvalidLeafHash { index: 1, len: 5 })
        ));
    }

    #[test]
    fn reject_too_large() {
        let tile = tile();
        let len = tile.encoded_len();

        assert!(encode_tile_with_limit(&tile, 0, len).is_ok());
        assert!(matches!(
            encode_tile_with_limit(&tile, 0, len - 1),
            Err(EncodeError::TooLarge(l)) if l == len
        ));
    }
}
