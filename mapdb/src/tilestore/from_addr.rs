use std::sync::Arc;
use url::Url;

use super::{MemoryTileStore, RedbTileStore, SqliteTileStore, TileStore};
use crate::sourcelog::from_addr::local_path;
use crate::Error;

/// Constructs a new instance of a [TileStore] from an URI.
///
/// The following URIs are supported:
/// - `memory://`
///   Uses a in-memory implementation.
/// - `redb://`
///   Uses redb with its in-memory backend.
/// - `redb:///absolute/path/to/somewhere`
///   Uses redb, persisting to the given file.
/// - `sqlite://`
///   Uses an in-memory SQLite database.
/// - `sqlite:///absolute/path/to/map.db`
///   Writes to the `tiles` table of a SQLite database.
pub async fn from_addr(uri: &str) -> Result<Arc<dyn TileStore>, Error> {
    let url =
        Url::parse(uri).map_err(|e| Error::StorageError(format!("unable to parse url: {}", e)))?;

    Ok(match url.scheme() {
        "memory" => {
            // memory doesn't support host or path in the URL.
            if url.has_host() || !url.path().is_empty() {
                return Err(Error::StorageError("invalid url".to_string()));
            }
            Arc::new(MemoryTileStore::default())
        }
        "redb" => match local_path(&url, "redb")? {
            None => Arc::new(RedbTileStore::new_temporary()?),
            Some(path) => Arc::new(RedbTileStore::new(path).await?),
        },
        "sqlite" => match local_path(&url, "sqlite")? {
            None => Arc::new(SqliteTileStore::new_temporary()?),
            Some(path) => Arc::new(SqliteTileStore::new(path).await?),
        },
        scheme => {
            return Err(Error::StorageError(format!("unknown scheme: {}", scheme)));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::from_addr;
    use lazy_static::lazy_static;
    use rstest::rstest;
    use tempfile::TempDir;

    lazy_static! {
        static ref TMPDIR_REDB: TempDir = TempDir::new().unwrap();
        static ref TMPDIR_SQLITE: TempDir = TempDir::new().unwrap();
    }

    #[rstest]
    #[case::unsupported_scheme("sled://", false)]
    #[case::memory_valid("memory://", true)]
    #[case::memory_invalid_path("memory:///foo", false)]
    #[case::redb_valid_temporary("redb://", true)]
    #[case::redb_valid_path(&format!("redb://{}", &TMPDIR_REDB.path().join("map.redb").to_str().unwrap()), true)]
    #[case::redb_invalid_root("redb:///", false)]
    #[case::sqlite_valid_temporary("sqlite://", true)]
    #[case::sqlite_valid_path(&format!("sqlite://{}", &TMPDIR_SQLITE.path().join("map.db").to_str().unwrap()), true)]
    #[case::sqlite_invalid_host("sqlite://foo.example/map.db", false)]
    #[tokio::test]
    async fn test_from_addr_tokio(#[case] uri_str: &str, #[case] exp_succeed: bool) {
        if exp_succeed {
            from_addr(uri_str).await.expect("should succeed");
        } else {
            assert!(from_addr(uri_str).await.is_err(), "should fail");
        }
    }
}
