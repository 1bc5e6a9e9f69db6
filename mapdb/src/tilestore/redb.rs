use async_trait::async_trait;
use bytes::Bytes;
use redb::{Database, ReadableTable, TableDefinition};
use std::{path::PathBuf, sync::Arc};
use tracing::instrument;

use super::TileStore;
use crate::utils::{open_redb, open_redb_temporary};
use crate::{Error, OutputRow};

/// (revision, path) -> serialized tile
const TILES_TABLE: TableDefinition<(u64, &[u8]), &[u8]> = TableDefinition::new("tiles");

/// TileStore implementation using redb under the hood.
/// Keys sort by revision first, so the highest revision is always the last
/// key in the table.
#[derive(Clone)]
pub struct RedbTileStore {
    // We wrap db in an Arc to be able to move it into spawn_blocking,
    // as discussed in https://github.com/cberner/redb/issues/789
    db: Arc<Database>,
}

impl RedbTileStore {
    /// Opens the store at the given path, creating it if needed.
    pub async fn new(path: PathBuf) -> Result<Self, Error> {
        Ok(Self {
            db: open_redb(path, true, create_schema).await?,
        })
    }

    /// Constructs a new instance using the in-memory backend.
    pub fn new_temporary() -> Result<Self, Error> {
        Ok(Self {
            db: open_redb_temporary(create_schema)?,
        })
    }
}

/// Creates TILES_TABLE if not present.
fn create_schema(db: &Database) -> Result<(), redb::Error> {
    let txn = db.begin_write()?;
    txn.open_table(TILES_TABLE)?;
    txn.commit()?;

    Ok(())
}

#[async_trait]
impl TileStore for RedbTileStore {
    #[instrument(skip(self))]
    async fn max_revision(&self) -> Result<Option<u64>, Error> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<_, Error> {
            let txn = db.begin_read()?;
            let table = txn.open_table(TILES_TABLE)?;
            // the access guards borrow the table, bind before returning.
            let max = table.last()?.map(|(k, _v)| k.value().0);
            Ok(max)
        })
        .await?
    }

    #[instrument(skip_all, fields(rows.len = rows.len()))]
    async fn put_batch(&self, rows: Vec<OutputRow>) -> Result<(), Error> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(TILES_TABLE)?;
                for row in &rows {
                    table.insert((row.revision, &row.path[..]), &row.tile[..])?;
                }
            }
            Ok(txn.commit()?)
        })
        .await?
    }

    #[instrument(skip(self, path))]
    async fn get(&self, revision: u64, path: &[u8]) -> Result<Option<Bytes>, Error> {
        let db = self.db.clone();
        let path = path.to_vec();

        tokio::task::spawn_blocking(move || -> Result<_, Error> {
            let txn = db.begin_read()?;
            let table = txn.open_table(TILES_TABLE)?;
            let tile = table.get((revision, path.as_slice()))?;
            Ok(tile.map(|v| Bytes::copy_from_slice(v.value())))
        })
        .await?
    }
}
