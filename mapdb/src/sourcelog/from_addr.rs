use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

use super::{MemorySourceLog, RedbSourceLog, SourceLog, SqliteSourceLog};
use crate::Error;

/// Constructs a new instance of a [SourceLog] from an URI.
///
/// The following URIs are supported:
/// - `memory://`
///   Uses a in-memory implementation.
/// - `redb://`
///   Uses redb with its in-memory backend.
/// - `redb:///absolute/path/to/somewhere`
///   Uses redb, reading an existing file.
/// - `sqlite://`
///   Uses an in-memory SQLite database.
/// - `sqlite:///absolute/path/to/sum.db`
///   Reads the `leafMetadata` table of a SQLite database, as written by the
///   sumdb auditor.
///
/// File-backed logs are never created here, a missing file or table is an
/// error. Use the backends' `create` constructors to start a new log.
pub async fn from_addr(uri: &str) -> Result<Arc<dyn SourceLog>, Error> {
    let url =
        Url::parse(uri).map_err(|e| Error::StorageError(format!("unable to parse url: {}", e)))?;

    Ok(match url.scheme() {
        "memory" => {
            // memory doesn't support host or path in the URL.
            if url.has_host() || !url.path().is_empty() {
                return Err(Error::StorageError("invalid url".to_string()));
            }
            Arc::new(MemorySourceLog::default())
        }
        "redb" => match local_path(&url, "redb")? {
            None => Arc::new(RedbSourceLog::new_temporary()?),
            Some(path) => Arc::new(RedbSourceLog::new(path).await?),
        },
        "sqlite" => match local_path(&url, "sqlite")? {
            None => Arc::new(SqliteSourceLog::new_temporary()?),
            Some(path) => Arc::new(SqliteSourceLog::new(path).await?),
        },
        scheme => {
            return Err(Error::StorageError(format!("unknown scheme: {}", scheme)));
        }
    })
}

/// Extracts the on-disk location from a file-backed store URL.
/// Returns `None` if no path was given, which selects a temporary store.
pub(crate) fn local_path(url: &Url, backend: &str) -> Result<Option<PathBuf>, Error> {
    // file-backed stores don't support a host, and a path can be provided
    // (otherwise they'll live in memory only).
    if url.has_host() {
        return Err(Error::StorageError("no host allowed".to_string()));
    }

    match url.path() {
        "" => Ok(None),
        "/" => Err(Error::StorageError(format!(
            "cowardly refusing to open / with {}",
            backend
        ))),
        path => Ok(Some(path.into())),
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use lazy_static::lazy_static;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::from_addr;
    use crate::fixtures::foo_record;
    use crate::sourcelog::{RedbSourceLog, SourceLog, SqliteSourceLog};

    lazy_static! {
        static ref TMPDIR_REDB_1: TempDir = TempDir::new().unwrap();
        static ref TMPDIR_REDB_2: TempDir = TempDir::new().unwrap();
        static ref TMPDIR_SQLITE_1: TempDir = TempDir::new().unwrap();
    }

    #[rstest]
    /// This uses an unsupported scheme.
    #[case::unsupported_scheme("http://foo.example/test", false)]
    /// This correctly sets the scheme, and doesn't set a path.
    #[case::memory_valid("memory://", true)]
    /// This sets a memory url host to `foo`
    #[case::memory_invalid_host("memory://foo", false)]
    /// This sets a memory url path to "/", which is invalid.
    #[case::memory_invalid_root_path("memory:///", false)]
    /// This configures redb in temporary mode.
    #[case::redb_valid_temporary("redb://", true)]
    /// This configures redb with /, which should fail.
    #[case::redb_invalid_root("redb:///", false)]
    /// This configures redb with a host, not path, which should fail.
    #[case::redb_invalid_host("redb://foo.example", false)]
    /// This configures redb with a path to a file that doesn't exist, which
    /// should fail.
    #[case::redb_missing_path(&format!("redb://{}", &TMPDIR_REDB_1.path().join("foo").to_str().unwrap()), false)]
    /// This configures redb with a host, and a valid path path, which should fail.
    #[case::redb_invalid_host_with_valid_path(&format!("redb://foo.example{}", &TMPDIR_REDB_2.path().join("bar").to_str().unwrap()), false)]
    /// This configures sqlite in temporary mode.
    #[case::sqlite_valid_temporary("sqlite://", true)]
    /// This configures sqlite with a file that doesn't exist, which should fail.
    #[case::sqlite_missing_path(&format!("sqlite://{}", &TMPDIR_SQLITE_1.path().join("sum.db").to_str().unwrap()), false)]
    /// This configures sqlite with /, which should fail.
    #[case::sqlite_invalid_root("sqlite:///", false)]
    #[tokio::test]
    async fn test_from_addr_tokio(#[case] uri_str: &str, #[case] exp_succeed: bool) {
        if exp_succeed {
            from_addr(uri_str).await.expect("should succeed");
        } else {
            assert!(from_addr(uri_str).await.is_err(), "should fail");
        }
    }

    /// Opening a log that isn't there must not leave an empty one behind.
    #[rstest]
    #[case::redb("redb", "typo.redb")]
    #[case::sqlite("sqlite", "typo-sum.db")]
    #[tokio::test]
    async fn missing_file_not_created(#[case] scheme: &str, #[case] file_name: &str) {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join(file_name);

        assert!(
            from_addr(&format!("{}://{}", scheme, path.to_str().unwrap()))
                .await
                .is_err(),
            "should fail"
        );
        assert!(!path.exists(), "must not create {:?}", path);
    }

    /// Logs created beforehand open fine and keep their records.
    #[rstest]
    #[case::redb("redb", "sum.redb")]
    #[case::sqlite("sqlite", "sum.db")]
    #[tokio::test]
    async fn opens_existing(#[case] scheme: &str, #[case] file_name: &str) {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join(file_name);

        {
            let source_log: Box<dyn SourceLog> = match scheme {
                "redb" => Box::new(RedbSourceLog::create(path.clone()).await.unwrap()),
                _ => Box::new(SqliteSourceLog::create(path.clone()).await.unwrap()),
            };
            source_log.append(vec![foo_record()]).await.unwrap();
        }

        let source_log = from_addr(&format!("{}://{}", scheme, path.to_str().unwrap()))
            .await
            .expect("should succeed");
        let records: Vec<_> = source_log.records(None).try_collect().await.unwrap();
        assert_eq!(vec![foo_record()], records);
    }

    /// A SQLite file without the `leafMetadata` table is not a source log.
    #[tokio::test]
    async fn sqlite_without_table() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("other.db");
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (id INTEGER PRIMARY KEY);")
            .unwrap();

        assert!(from_addr(&format!("sqlite://{}", path.to_str().unwrap()))
            .await
            .is_err());
    }
}
