use crate::{InputRecord, OutputRow};

pub const FOO_MODULE: &str = "example.com/foo";
pub const FOO_VERSION: &str = "v1.0.0";
pub const FOO_REPO_HASH: &str = "rh1";
pub const FOO_MOD_HASH: &str = "mh1";

/// The record used for the golden leaf vectors.
pub fn foo_record() -> InputRecord {
    InputRecord {
        id: 0,
        module: FOO_MODULE.to_string(),
        version: FOO_VERSION.to_string(),
        repo_hash: FOO_REPO_HASH.to_string(),
        mod_hash: FOO_MOD_HASH.to_string(),
    }
}

/// Produces `n` distinct records with ids `0..n`, spread over a handful of
/// modules with several versions each.
pub fn synthetic_records(n: usize) -> Vec<InputRecord> {
    (0..n)
        .map(|i| InputRecord {
            id: i as i64,
            module: format!("example.com/mod{}", i % 7),
            version: format!("v0.{}.{}", i / 7, i % 3),
            repo_hash: format!("h1:repo{}", i),
            mod_hash: format!("h1:gomod{}", i),
        })
        .collect()
}

/// A row for tile store tests.
pub fn row(revision: u64, path: &'static [u8], tile: &'static [u8]) -> OutputRow {
    OutputRow {
        revision,
        path: bytes::Bytes::from_static(path),
        tile: bytes::Bytes::from_static(tile),
    }
}
