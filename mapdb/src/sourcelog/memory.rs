use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use super::{ensure_unique_ids, SourceLog};
use crate::{Error, InputRecord};

/// Keeps the log in a [BTreeMap] keyed by record id.
#[derive(Clone, Default)]
pub struct MemorySourceLog {
    db: Arc<RwLock<BTreeMap<i64, InputRecord>>>,
}

#[async_trait]
impl SourceLog for MemorySourceLog {
    #[instrument(skip(self))]
    fn records(&self, bound: Option<i64>) -> BoxStream<'static, Result<InputRecord, Error>> {
        let db = self.db.read();

        // Copy the selected range out, the lock can't escape this function.
        let items: Vec<_> = match bound {
            Some(bound) => db.range(..bound).map(|(_, v)| Ok(v.clone())).collect(),
            None => db.values().map(|v| Ok(v.clone())).collect(),
        };

        stream::iter(items).boxed()
    }

    #[instrument(skip_all, fields(records.len = records.len()))]
    async fn append(&self, records: Vec<InputRecord>) -> Result<(), Error> {
        ensure_unique_ids(&records)?;

        let mut db = self.db.write();

        if let Some(dup) = records.iter().find(|r| db.contains_key(&r.id)) {
            return Err(Error::InvalidRequest(format!(
                "record with id {} already exists",
                dup.id
            )));
        }

        for record in records {
            db.insert(record.id, record);
        }

        Ok(())
    }
}
