use async_trait::async_trait;
use futures::stream::BoxStream;

use std::collections::HashSet;

use crate::{Error, InputRecord};

pub(crate) mod from_addr;
mod memory;
mod redb;
mod sqlite;

pub use self::from_addr::from_addr;
pub use self::memory::MemorySourceLog;
pub use self::redb::RedbSourceLog;
pub use self::sqlite::SqliteSourceLog;

/// The append-only log of module versions the map is built from.
#[async_trait]
pub trait SourceLog: Send + Sync {
    /// Streams records in id order.
    ///
    /// With a `bound`, only records with `id < bound` are returned, which
    /// selects the earliest entries of the log. Without one, all records are
    /// returned.
    fn records(&self, bound: Option<i64>) -> BoxStream<'static, Result<InputRecord, Error>>;

    /// Appends records to the log.
    /// Implementations MUST reject records whose id is already present, and
    /// MUST NOT write any of the batch in that case.
    async fn append(&self, records: Vec<InputRecord>) -> Result<(), Error>;
}

/// Rejects batches that carry the same id more than once.
pub(crate) fn ensure_unique_ids(records: &[InputRecord]) -> Result<(), Error> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(Error::InvalidRequest(format!(
                "record id {} appears twice in batch",
                record.id
            )));
        }
    }
    Ok(())
}
