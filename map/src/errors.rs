use thiserror::Error;
use tokio::task::JoinError;

use crate::builder::BuildError;
use crate::encoder::EncodeError;

/// Errors aborting a map run. Each variant names the stage that failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to resolve next revision: {0}")]
    Revision(#[source] sumdb_mapdb::Error),

    #[error("no revision left after {0}")]
    RevisionExhausted(u64),

    #[error("failed to read source log: {0}")]
    Source(#[source] sumdb_mapdb::Error),

    #[error("failed to build map tiles: {0}")]
    Build(#[from] BuildError),

    #[error("failed to encode tile {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: EncodeError,
    },

    #[error("failed to write tiles of revision {revision}: {source}")]
    Write {
        revision: u64,
        #[source]
        source: sumdb_mapdb::Error,
    },

    #[error("background task failed: {0}")]
    Task(#[from] JoinError),
}
