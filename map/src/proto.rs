//! Protobuf messages describing map tiles, as stored in the tile store.

use bytes::Bytes;

/// A fragment of the map, holding the leaves below `path`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tile {
    /// Key prefix identifying the position of the tile in the map.
    #[prost(bytes = "bytes", tag = "1")]
    pub path: Bytes,
    /// Leaves of the tile, ordered by their path.
    #[prost(message, repeated, tag = "2")]
    pub leaves: Vec<TileLeaf>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TileLeaf {
    /// Remainder of the key, relative to the tile path.
    #[prost(bytes = "bytes", tag = "1")]
    pub path: Bytes,
    #[prost(bytes = "bytes", tag = "2")]
    pub hash: Bytes,
}
