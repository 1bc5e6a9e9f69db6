use sumdb_mapdb::tilestore::TileStore;
use tracing::{info, instrument};

use crate::Error;

/// Determines the revision the next run writes to: one past the highest
/// revision in the store, or 0 if the store is still empty.
///
/// This must be resolved once per run, before any tile is produced.
#[instrument(skip_all, err)]
pub async fn next_revision(tile_store: &dyn TileStore) -> Result<u64, Error> {
    match tile_store.max_revision().await.map_err(Error::Revision)? {
        None => {
            info!("no revisions found, starting at 0");
            Ok(0)
        }
        Some(max) => {
            let next = max.checked_add(1).ok_or(Error::RevisionExhausted(max))?;
            info!(revision.max = max, "found previous revision");
            Ok(next)
        }
    }
}
