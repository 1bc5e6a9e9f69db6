use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::{path::PathBuf, sync::Arc};
use tracing::instrument;

use super::TileStore;
use crate::{Error, OutputRow};

/// TileStore implementation writing to the `tiles` table of a SQLite
/// database, the layout the map verifier reads from.
#[derive(Clone)]
pub struct SqliteTileStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTileStore {
    /// Opens (or creates) the database at the given path.
    pub async fn new(path: PathBuf) -> Result<Self, Error> {
        if path == PathBuf::from("/") {
            return Err(Error::StorageError(
                "cowardly refusing to open / with sqlite".to_string(),
            ));
        }

        let conn = tokio::task::spawn_blocking(move || -> Result<_, Error> {
            let conn = Connection::open(path)?;
            create_schema(&conn)?;
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Constructs a new instance backed by an in-memory database.
    pub fn new_temporary() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        create_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn create_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tiles (
            revision INTEGER NOT NULL,
            path BLOB NOT NULL,
            tile BLOB,
            PRIMARY KEY (revision, path)
        );",
    )
}

/// SQLite integers are signed, revisions are not.
fn to_sql_revision(revision: u64) -> Result<i64, Error> {
    i64::try_from(revision)
        .map_err(|_| Error::InvalidRequest(format!("revision {} out of range", revision)))
}

#[async_trait]
impl TileStore for SqliteTileStore {
    #[instrument(skip(self))]
    async fn max_revision(&self) -> Result<Option<u64>, Error> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || -> Result<_, Error> {
            let conn = conn.lock();
            // MAX() over an empty table yields a single NULL row.
            let max: Option<i64> =
                conn.query_row("SELECT MAX(revision) FROM tiles", [], |row| row.get(0))?;

            max.map(|max| {
                u64::try_from(max).map_err(|_| {
                    Error::StorageError(format!("negative revision {} in tiles table", max))
                })
            })
            .transpose()
        })
        .await?
    }

    #[instrument(skip_all, fields(rows.len = rows.len()))]
    async fn put_batch(&self, rows: Vec<OutputRow>) -> Result<(), Error> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            let mut conn = conn.lock();
            let txn = conn.transaction()?;
            {
                let mut stmt = txn.prepare_cached(
                    "INSERT OR REPLACE INTO tiles (revision, path, tile) VALUES (?1, ?2, ?3)",
                )?;
                for row in &rows {
                    stmt.execute(params![
                        to_sql_revision(row.revision)?,
                        &row.path[..],
                        &row.tile[..]
                    ])?;
                }
            }
            Ok(txn.commit()?)
        })
        .await?
    }

    #[instrument(skip(self, path))]
    async fn get(&self, revision: u64, path: &[u8]) -> Result<Option<Bytes>, Error> {
        let conn = self.conn.clone();
        let revision = to_sql_revision(revision)?;
        let path = path.to_vec();

        tokio::task::spawn_blocking(move || -> Result<_, Error> {
            let conn = conn.lock();
            let tile: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT tile FROM tiles WHERE revision = ?1 AND path = ?2",
                    params![revision, path],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(tile.map(Bytes::from))
        })
        .await?
    }
}
