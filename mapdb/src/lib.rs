//! Storage for the sumdb map builder.
//!
//! Two capabilities live here: a [sourcelog::SourceLog], the append-only log
//! of module versions read from the checksum database, and a
//! [tilestore::TileStore], which keeps the map tiles of every revision.
//! Both come with memory, redb and SQLite backends, picked by URL through
//! their `from_addr` functions. File-backed source logs must already exist,
//! tile stores are created on first use.

mod errors;
mod record;
mod utils;

#[cfg(test)]
use rstest_reuse;

pub mod fixtures;
pub mod sourcelog;
pub mod tilestore;

pub use errors::Error;
pub use record::{InputRecord, OutputRow};
