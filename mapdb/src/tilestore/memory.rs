use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use super::TileStore;
use crate::{Error, OutputRow};

#[derive(Clone, Default)]
pub struct MemoryTileStore {
    db: Arc<RwLock<BTreeMap<(u64, Bytes), Bytes>>>,
}

#[async_trait]
impl TileStore for MemoryTileStore {
    #[instrument(skip(self))]
    async fn max_revision(&self) -> Result<Option<u64>, Error> {
        let db = self.db.read();
        Ok(db.keys().next_back().map(|(revision, _)| *revision))
    }

    #[instrument(skip_all, fields(rows.len = rows.len()))]
    async fn put_batch(&self, rows: Vec<OutputRow>) -> Result<(), Error> {
        let mut db = self.db.write();
        for row in rows {
            db.insert((row.revision, row.path), row.tile);
        }
        Ok(())
    }

    #[instrument(skip(self, path))]
    async fn get(&self, revision: u64, path: &[u8]) -> Result<Option<Bytes>, Error> {
        let db = self.db.read();
        Ok(db.get(&(revision, Bytes::copy_from_slice(path))).cloned())
    }
}
