//! Key and leaf hashing for the map.
//!
//! Keys are SHA-512/256 digests of a textual description of the leaf. Leaf
//! values use the CONIKS leaf hash, which prefixes the content with a domain
//! separator, the tree id and the full-depth key, so a leaf value can neither
//! be replayed in another tree nor at another position of the same tree.

use data_encoding::HEXLOWER;
use sha2::{Digest, Sha512_256};
use thiserror::Error;

/// Length of keys and hashes in bytes.
pub const HASH_LEN: usize = 32;

/// Depth of a leaf in the map, one level per key bit.
const KEY_BITS: u32 = (HASH_LEN * 8) as u32;

/// The algorithm keys and leaves are hashed with.
pub const HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha512_256;

/// Domain separator for leaf hashes.
const LEAF_IDENTIFIER: &[u8] = b"L";

/// The hash algorithms a map can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha512_256,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha512_256 => write!(f, "SHA-512/256"),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid key length: {0}")]
    InvalidKeyLen(usize),
}

/// A position in the key space of the map.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapKey([u8; HASH_LEN]);

impl MapKey {
    /// Derives the key for the given description.
    pub fn for_bytes(data: impl AsRef<[u8]>) -> Self {
        Self(Sha512_256::digest(data).into())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }
}

impl From<[u8; HASH_LEN]> for MapKey {
    fn from(value: [u8; HASH_LEN]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for MapKey {
    type Error = Error;

    // Returns an error if the slice has the wrong length.
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(
            value
                .try_into()
                .map_err(|_| Error::InvalidKeyLen(value.len()))?,
        ))
    }
}

impl std::fmt::Display for MapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.0))
    }
}

impl std::fmt::Debug for MapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MapKey({})", HEXLOWER.encode(&self.0))
    }
}

/// Computes the CONIKS leaf hash:
/// `H("L" || be_u64(tree_id) || key || be_u32(256) || leaf)`.
pub fn hash_leaf(tree_id: i64, key: &MapKey, leaf: &[u8]) -> [u8; HASH_LEN] {
    let mut h = Sha512_256::new();
    h.update(LEAF_IDENTIFIER);
    // the tree id is hashed as its two's complement bit pattern.
    h.update((tree_id as u64).to_be_bytes());
    h.update(key.as_slice());
    h.update(KEY_BITS.to_be_bytes());
    h.update(leaf);
    h.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::{hash_leaf, MapKey, HASH_LEN};
    use hex_literal::hex;

    /// Known answer for SHA-512/256 ("abc"), from FIPS 180-4.
    #[test]
    fn sha512_256_known_answer() {
        assert_eq!(
            MapKey::from(hex!(
                "53048e2681941ef99b2e29b76b4c7dabe4c2d0c634fc6d46e0e2f13107e7af23"
            )),
            MapKey::for_bytes(b"abc")
        );
    }

    #[test]
    fn leaf_hash_binds_tree_key_and_content() {
        let key = MapKey::for_bytes(b" ");
        let leaf = hash_leaf(12345, &key, b"");
        assert_eq!(
            hex!("09b190785cd6b60acf5787d6ae371bd95544f6ea56fb76d36dd6a0bb99ddd080"),
            leaf
        );

        assert_ne!(leaf, hash_leaf(12346, &key, b""));
        assert_ne!(leaf, hash_leaf(12345, &MapKey::for_bytes(b"  "), b""));
        assert_ne!(leaf, hash_leaf(12345, &key, b"x"));
    }

    #[test]
    fn key_from_slice() {
        let key = MapKey::for_bytes(b"foo");
        assert_eq!(Ok(key), MapKey::try_from(key.as_slice()));
        assert_eq!(
            Err(super::Error::InvalidKeyLen(HASH_LEN - 1)),
            MapKey::try_from(&key.as_slice()[1..])
        );
    }

    #[test]
    fn display_is_lowercase_hex() {
        assert_eq!(
            "7d3ce7727862859f86f993df322eb85dc557160d1419b30c061f7d7a738d39e7",
            MapKey::for_bytes("example.com/foo v1.0.0/go.mod").to_string()
        );
    }
}
