use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use redb::{Database, ReadableTable, TableDefinition};
use std::{path::PathBuf, sync::Arc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{instrument, warn};

use super::{ensure_unique_ids, SourceLog};
use crate::utils::{open_redb, open_redb_temporary};
use crate::{Error, InputRecord};

/// id -> (module, version, repo_hash, mod_hash)
const LEAF_METADATA_TABLE: TableDefinition<i64, (&str, &str, &str, &str)> =
    TableDefinition::new("leaf_metadata");

/// SourceLog implementation using redb under the hood.
/// All records live in a single table, keyed by their id, so range reads give
/// us the bounded mode for free.
#[derive(Clone)]
pub struct RedbSourceLog {
    // We wrap db in an Arc to be able to move it into spawn_blocking,
    // as discussed in https://github.com/cberner/redb/issues/789
    db: Arc<Database>,
}

impl RedbSourceLog {
    /// Opens an existing log at the given path.
    /// Fails if the file or its table is missing.
    pub async fn new(path: PathBuf) -> Result<Self, Error> {
        Ok(Self {
            db: open_redb(path, false, check_schema).await?,
        })
    }

    /// Creates a log at the given path, or opens it if it's already there.
    pub async fn create(path: PathBuf) -> Result<Self, Error> {
        Ok(Self {
            db: open_redb(path, true, create_schema).await?,
        })
    }

    /// Constructs a new, empty instance using the in-memory backend.
    pub fn new_temporary() -> Result<Self, Error> {
        Ok(Self {
            db: open_redb_temporary(create_schema)?,
        })
    }
}

fn create_schema(db: &Database) -> Result<(), redb::Error> {
    let txn = db.begin_write()?;
    txn.open_table(LEAF_METADATA_TABLE)?;
    txn.commit()?;

    Ok(())
}

fn check_schema(db: &Database) -> Result<(), redb::Error> {
    let txn = db.begin_read()?;
    txn.open_table(LEAF_METADATA_TABLE)?;

    Ok(())
}

/// Sends all records (optionally `id < bound`) to `tx`.
fn send_records(
    db: &Database,
    bound: Option<i64>,
    tx: &tokio::sync::mpsc::Sender<Result<InputRecord, Error>>,
) -> Result<(), Error> {
    let txn = db.begin_read()?;
    let table = txn.open_table(LEAF_METADATA_TABLE)?;

    let range = match bound {
        Some(bound) => table.range(..bound)?,
        None => table.range::<i64>(..)?,
    };

    for elem in range {
        let (k, v) = elem?;
        let (module, version, repo_hash, mod_hash) = v.value();
        let record = InputRecord {
            id: k.value(),
            module: module.to_string(),
            version: version.to_string(),
            repo_hash: repo_hash.to_string(),
            mod_hash: mod_hash.to_string(),
        };

        if tx.blocking_send(Ok(record)).is_err() {
            // receiver went away, nobody is interested anymore.
            return Ok(());
        }
    }

    Ok(())
}

#[async_trait]
impl SourceLog for RedbSourceLog {
    #[instrument(skip(self))]
    fn records(&self, bound: Option<i64>) -> BoxStream<'static, Result<InputRecord, Error>> {
        let db = self.db.clone();
        let (tx, rx) = tokio::sync::mpsc::channel(256);

        tokio::task::spawn_blocking(move || {
            if let Err(e) = send_records(&db, bound, &tx) {
                warn!(err=%e, "failed to read source log");
                let _ = tx.blocking_send(Err(e));
            }
        });

        ReceiverStream::new(rx).boxed()
    }

    #[instrument(skip_all, fields(records.len = records.len()))]
    async fn append(&self, records: Vec<InputRecord>) -> Result<(), Error> {
        ensure_unique_ids(&records)?;

        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(LEAF_METADATA_TABLE)?;
                for record in &records {
                    if table.get(record.id)?.is_some() {
                        // dropping the uncommitted transaction discards the batch.
                        return Err(Error::InvalidRequest(format!(
                            "record with id {} already exists",
                            record.id
                        )));
                    }
                    table.insert(
                        record.id,
                        (
                            record.module.as_str(),
                            record.version.as_str(),
                            record.repo_hash.as_str(),
                            record.mod_hash.as_str(),
                        ),
                    )?;
                }
            }
            Ok(txn.commit()?)
        })
        .await?
    }
}
