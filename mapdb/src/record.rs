use bytes::Bytes;

/// A single module version observed in the checksum database, together with
/// its position in the source log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputRecord {
    /// Position in the source log. Only used to bound reads.
    pub id: i64,
    pub module: String,
    pub version: String,
    /// Hash of the repository contents at this version.
    pub repo_hash: String,
    /// Hash of the go.mod file at this version.
    pub mod_hash: String,
}

/// A serialized tile, stamped with the revision it was written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub revision: u64,
    pub path: Bytes,
    pub tile: Bytes,
}
