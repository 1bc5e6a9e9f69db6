use redb::Database;
use std::{path::PathBuf, sync::Arc};

use crate::Error;

/// Prepares a freshly opened database, creating or checking its tables.
pub(crate) type RedbInit = fn(&Database) -> Result<(), redb::Error>;

/// Opens the redb database at `path` and runs `init` on it.
///
/// With `create` unset, a missing file is an error instead of a new, empty
/// database.
pub(crate) async fn open_redb(
    path: PathBuf,
    create: bool,
    init: RedbInit,
) -> Result<Arc<Database>, Error> {
    if path == PathBuf::from("/") {
        return Err(Error::StorageError(
            "cowardly refusing to open / with redb".to_string(),
        ));
    }

    let db = tokio::task::spawn_blocking(move || -> Result<_, Error> {
        let db = if create {
            Database::create(&path)?
        } else {
            Database::open(&path).map_err(|e| {
                Error::StorageError(format!("unable to open {}: {}", path.display(), e))
            })?
        };
        init(&db)?;
        Ok(db)
    })
    .await??;

    Ok(Arc::new(db))
}

/// Creates a database on the in-memory backend and runs `init` on it.
pub(crate) fn open_redb_temporary(init: RedbInit) -> Result<Arc<Database>, Error> {
    let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
    init(&db)?;

    Ok(Arc::new(db))
}
