use async_trait::async_trait;
use bytes::Bytes;

use crate::{Error, OutputRow};

mod from_addr;
mod memory;
mod redb;
mod sqlite;

pub use self::from_addr::from_addr;
pub use self::memory::MemoryTileStore;
pub use self::redb::RedbTileStore;
pub use self::sqlite::SqliteTileStore;

/// Durable storage for map tiles.
///
/// Rows of different revisions coexist, a revision is identified purely by
/// the `revision` field of the rows written under it.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Returns the highest revision any row was written under.
    /// An empty store returns `Ok(None)`, which is not an error.
    async fn max_revision(&self) -> Result<Option<u64>, Error>;

    /// Writes a batch of rows in one transaction.
    /// Batch boundaries carry no meaning beyond that.
    async fn put_batch(&self, rows: Vec<OutputRow>) -> Result<(), Error>;

    /// Retrieves the serialized tile at `path` for the given revision.
    async fn get(&self, revision: u64, path: &[u8]) -> Result<Option<Bytes>, Error>;
}
