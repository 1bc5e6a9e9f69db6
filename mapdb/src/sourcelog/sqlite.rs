use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::{path::PathBuf, sync::Arc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{instrument, warn};

use super::{ensure_unique_ids, SourceLog};
use crate::{Error, InputRecord};

/// SourceLog implementation reading the `leafMetadata` table of the SQLite
/// database written by the sumdb auditor.
#[derive(Clone)]
pub struct SqliteSourceLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSourceLog {
    /// Opens an existing database at the given path.
    /// Fails if the file or its `leafMetadata` table is missing.
    pub async fn new(path: PathBuf) -> Result<Self, Error> {
        Self::open(path, false).await
    }

    /// Creates the database at the given path, or opens it if it's already
    /// there.
    pub async fn create(path: PathBuf) -> Result<Self, Error> {
        Self::open(path, true).await
    }

    async fn open(path: PathBuf, create: bool) -> Result<Self, Error> {
        if path == PathBuf::from("/") {
            return Err(Error::StorageError(
                "cowardly refusing to open / with sqlite".to_string(),
            ));
        }

        let conn = tokio::task::spawn_blocking(move || -> Result<_, Error> {
            let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            if create {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }

            let conn = Connection::open_with_flags(&path, flags).map_err(|e| {
                Error::StorageError(format!("unable to open {}: {}", path.display(), e))
            })?;
            if create {
                create_schema(&conn)?;
            } else {
                check_schema(&conn)?;
            }
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Constructs a new, empty instance backed by an in-memory database.
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
        "CREATE TABLE IF NOT EXISTS leafMetadata (
            id INTEGER PRIMARY KEY,
            module TEXT,
            version TEXT,
            repohash TEXT,
            modhash TEXT
        );",
    )
}

fn check_schema(conn: &Connection) -> Result<(), Error> {
    let table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'leafMetadata'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match table {
        Some(_) => Ok(()),
        None => Err(Error::StorageError(
            "database has no leafMetadata table".to_string(),
        )),
    }
}

fn send_records(
    conn: &Connection,
    bound: Option<i64>,
    tx: &tokio::sync::mpsc::Sender<Result<InputRecord, Error>>,
) -> Result<(), Error> {
    let mut stmt = conn.prepare(
        "SELECT id, module, version, repohash, modhash FROM leafMetadata
         WHERE ?1 IS NULL OR id < ?1 ORDER BY id",
    )?;

    let rows = stmt.query_map(params![bound], |row| {
        Ok(InputRecord {
            id: row.get(0)?,
            module: row.get(1)?,
            version: row.get(2)?,
            repo_hash: row.get(3)?,
            mod_hash: row.get(4)?,
        })
    })?;

    for record in rows {
        if tx.blocking_send(Ok(record?)).is_err() {
            return Ok(());
        }
    }

    Ok(())
}

#[async_trait]
impl SourceLog for SqliteSourceLog {
    #[instrument(skip(self))]
    fn records(&self, bound: Option<i64>) -> BoxStream<'static, Result<InputRecord, Error>> {
        let conn = self.conn.clone();
        let (tx, rx) = tokio::sync::mpsc::channel(256);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            if let Err(e) = send_records(&conn, bound, &tx) {
                warn!(err=%e, "failed to read source log");
                let _ = tx.blocking_send(Err(e));
            }
        });

        ReceiverStream::new(rx).boxed()
    }

    #[instrument(skip_all, fields(records.len = records.len()))]
    async fn append(&self, records: Vec<InputRecord>) -> Result<(), Error> {
        ensure_unique_ids(&records)?;

        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            let mut conn = conn.lock();
            let txn = conn.transaction()?;
            for record in &records {
                let exists: Option<i64> = txn
                    .query_row(
                        "SELECT id FROM leafMetadata WHERE id = ?1",
                        params![record.id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_some() {
                    // the transaction rolls back when dropped.
                    return Err(Error::InvalidRequest(format!(
                        "record with id {} already exists",
                        record.id
                    )));
                }
                txn.execute(
                    "INSERT INTO leafMetadata (id, module, version, repohash, modhash)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        record.id,
                        record.module,
                        record.version,
                        record.repo_hash,
                        record.mod_hash
                    ],
                )?;
            }
            Ok(txn.commit()?)
        })
        .await?
    }
}
