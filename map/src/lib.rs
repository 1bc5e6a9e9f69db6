//! Builds a verifiable map from the module versions of the Go checksum
//! database.
//!
//! Every module version turns into two leaves (see [leaf::derive_leaves]),
//! the leaves are laid out into tiles by a [builder::MapBuilder], and the
//! tiles are persisted under a fresh revision (see [run::MapRun]).

mod errors;

pub mod builder;
pub mod encoder;
pub mod hashing;
pub mod leaf;
pub mod proto;
pub mod revision;
pub mod run;

pub use errors::Error;
pub use hashing::{HashAlgorithm, MapKey};
pub use leaf::LeafEntry;
pub use run::{Config, MapRun, RunState, RunSummary};

#[cfg(test)]
mod tests;
