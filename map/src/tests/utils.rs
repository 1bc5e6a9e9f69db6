use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use sumdb_mapdb::sourcelog::{MemorySourceLog, SourceLog};
use sumdb_mapdb::tilestore::{MemoryTileStore, TileStore};
use sumdb_mapdb::{Error, InputRecord, OutputRow};

use crate::builder::{BuildError, MapBuilder};
use crate::hashing::{HashAlgorithm, MapKey};
use crate::leaf::LeafEntry;
use crate::proto::{Tile, TileLeaf};

fn broken() -> Error {
    Error::StorageError("disk on fire".into())
}

/// A store whose every operation fails.
pub struct BrokenTileStore;

#[async_trait]
impl TileStore for BrokenTileStore {
    async fn max_revision(&self) -> Result<Option<u64>, Error> {
        Err(broken())
    }

    async fn put_batch(&self, _rows: Vec<OutputRow>) -> Result<(), Error> {
        Err(broken())
    }

    async fn get(&self, _revision: u64, _path: &[u8]) -> Result<Option<Bytes>, Error> {
        Err(broken())
    }
}

/// Wraps a [MemoryTileStore], failing every write once `healthy_batches`
/// batches went through.
pub struct FlakyTileStore {
    pub inner: MemoryTileStore,
    healthy_batches: usize,
    written: AtomicUsize,
}

impl FlakyTileStore {
    pub fn new(inner: MemoryTileStore, healthy_batches: usize) -> Self {
        Self {
            inner,
            healthy_batches,
            written: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TileStore for FlakyTileStore {
    async fn max_revision(&self) -> Result<Option<u64>, Error> {
        self.inner.max_revision().await
    }

    async fn put_batch(&self, rows: Vec<OutputRow>) -> Result<(), Error> {
        if self.written.fetch_add(1, Ordering::SeqCst) >= self.healthy_batches {
            return Err(broken());
        }
        self.inner.put_batch(rows).await
    }

    async fn get(&self, revision: u64, path: &[u8]) -> Result<Option<Bytes>, Error> {
        self.inner.get(revision, path).await
    }
}

/// Wraps a [MemorySourceLog], counting how often it was read.
#[derive(Default)]
pub struct CountingSourceLog {
    pub inner: MemorySourceLog,
    pub reads: AtomicUsize,
}

#[async_trait]
impl SourceLog for CountingSourceLog {
    fn records(&self, bound: Option<i64>) -> BoxStream<'static, Result<InputRecord, Error>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.records(bound)
    }

    async fn append(&self, records: Vec<InputRecord>) -> Result<(), Error> {
        self.inner.append(records).await
    }
}

/// A source log whose stream fails right away.
pub struct BrokenSourceLog;

#[async_trait]
impl SourceLog for BrokenSourceLog {
    fn records(&self, _bound: Option<i64>) -> BoxStream<'static, Result<InputRecord, Error>> {
        Box::pin(futures::stream::once(async { Err(broken()) }))
    }

    async fn append(&self, _records: Vec<InputRecord>) -> Result<(), Error> {
        Err(broken())
    }
}

/// A builder that always rejects its input.
pub struct FailingBuilder;

impl MapBuilder for FailingBuilder {
    fn build(
        &self,
        _tree_id: i64,
        _hash_algorithm: HashAlgorithm,
        _prefix_strata: u8,
        _leaves: Vec<LeafEntry>,
    ) -> Result<Vec<Tile>, BuildError> {
        Err(BuildError::DuplicateKey(MapKey::for_bytes(b"dup")))
    }
}

/// A builder emitting a valid tile followed by one with a truncated leaf hash.
pub struct MalformedBuilder;

impl MapBuilder for MalformedBuilder {
    fn build(
        &self,
        _tree_id: i64,
        _hash_algorithm: HashAlgorithm,
        _prefix_strata: u8,
        _leaves: Vec<LeafEntry>,
    ) -> Result<Vec<Tile>, BuildError> {
        Ok(vec![
            Tile {
                path: Bytes::from_static(b"\x00"),
                leaves: vec![],
            },
            Tile {
                path: Bytes::from_static(b"\x01"),
                leaves: vec![TileLeaf {
                    path: Bytes::from_static(b"\x02"),
                    hash: Bytes::from_static(b"\x03"),
                }],
            },
        ])
    }
}
