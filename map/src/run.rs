use futures::TryStreamExt;
use std::sync::Arc;
use sumdb_mapdb::{sourcelog::SourceLog, tilestore::TileStore, InputRecord, OutputRow};
use tracing::{error, info, info_span, instrument, warn, Instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::builder::MapBuilder;
use crate::encoder::encode_tile;
use crate::hashing::{HASH_ALGORITHM, HASH_LEN};
use crate::leaf::derive_all;
use crate::revision::next_revision;
use crate::Error;

/// Parameters of a single map run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Salts the leaf hashes, so the same leaf can't be replayed in another
    /// map.
    pub tree_id: i64,
    /// Number of 8-bit strata above the leaf-bearing tiles, handed to the
    /// map builder.
    pub prefix_strata: u8,
    /// Only consume records with an id below this bound. `None` reads the
    /// whole log.
    pub count: Option<i64>,
    /// Number of rows written per storage transaction.
    pub write_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tree_id: 12345,
            prefix_strata: 2,
            count: None,
            write_batch_size: 250,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.write_batch_size == 0 {
            return Err(Error::Config("write batch size must be positive".into()));
        }
        if let Some(count) = self.count {
            if count < 0 {
                return Err(Error::Config(format!("negative record count {}", count)));
            }
        }
        if self.prefix_strata as usize >= HASH_LEN {
            return Err(Error::Config(format!(
                "{} prefix strata leave no room for leaves",
                self.prefix_strata
            )));
        }
        Ok(())
    }
}

/// Where a [MapRun] is at. Every state past `Idle` carries the revision the
/// run writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    RevisionResolved(u64),
    Processing(u64),
    Persisting(u64),
    Done(u64),
    Failed,
}

/// What a successful run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub revision: u64,
    pub records: usize,
    pub leaves: usize,
    pub tiles: usize,
}

/// Builds one new revision of the map from the source log.
///
/// A run resolves its revision first, derives the leaves of all records,
/// hands them to the builder, and writes the encoded tiles. It either
/// completes or fails as a whole, there are no retries. A failed run may
/// leave rows of its revision behind; the next run skips past them.
///
/// Runs against the same tile store must not overlap.
pub struct MapRun {
    config: Config,
    source_log: Arc<dyn SourceLog>,
    tile_store: Arc<dyn TileStore>,
    builder: Arc<dyn MapBuilder>,
    state: RunState,
}

impl MapRun {
    pub fn new(
        config: Config,
        source_log: Arc<dyn SourceLog>,
        tile_store: Arc<dyn TileStore>,
        builder: Arc<dyn MapBuilder>,
    ) -> Self {
        Self {
            config,
            source_log,
            tile_store,
            builder,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    #[instrument(skip_all, fields(tree_id = self.config.tree_id))]
    pub async fn run(&mut self) -> Result<RunSummary, Error> {
        if self.state != RunState::Idle {
            return Err(Error::Config(format!(
                "run already used, currently {:?}",
                self.state
            )));
        }

        match self.run_stages().await {
            Ok(summary) => {
                self.transition(RunState::Done(summary.revision));
                Ok(summary)
            }
            Err(e) => {
                error!(err=%e, state=?self.state, "run failed");
                self.transition(RunState::Failed);
                Err(e)
            }
        }
    }

    fn transition(&mut self, state: RunState) {
        info!(from=?self.state, to=?state, "state transition");
        self.state = state;
    }

    async fn run_stages(&mut self) -> Result<RunSummary, Error> {
        self.config.validate()?;

        let revision = next_revision(self.tile_store.as_ref()).await?;
        self.transition(RunState::RevisionResolved(revision));

        self.transition(RunState::Processing(revision));
        let records = self
            .source_log
            .records(self.config.count)
            .try_collect::<Vec<InputRecord>>()
            .instrument(info_span!("read_source_log", count = ?self.config.count))
            .await
            .map_err(Error::Source)?;
        info!(records.len = records.len(), "read source log");

        let tree_id = self.config.tree_id;
        let (records_len, leaves) = tokio::task::spawn_blocking(move || {
            let leaves = derive_all(tree_id, &records);
            (records.len(), leaves)
        })
        .await?;
        let leaves_len = leaves.len();
        info!(leaves.len = leaves_len, "derived leaves");

        self.transition(RunState::Persisting(revision));
        let builder = self.builder.clone();
        let prefix_strata = self.config.prefix_strata;
        let tiles = tokio::task::spawn_blocking(move || {
            builder.build(tree_id, HASH_ALGORITHM, prefix_strata, leaves)
        })
        .await??;
        if tiles.is_empty() {
            warn!(revision, "map builder produced no tiles");
        }

        let rows = tiles
            .iter()
            .map(|tile| {
                encode_tile(tile, revision).map_err(|e| Error::Encode {
                    path: data_encoding::HEXLOWER.encode(&tile.path),
                    source: e,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        drop(tiles);

        let tiles_len = rows.len();
        self.write_rows(revision, rows).await?;

        Ok(RunSummary {
            revision,
            records: records_len,
            leaves: leaves_len,
            tiles: tiles_len,
        })
    }

    /// Writes all rows, `write_batch_size` at a time.
    #[instrument(skip(self, rows), fields(rows.len = rows.len(), indicatif.pb_show = 1))]
    async fn write_rows(&self, revision: u64, rows: Vec<OutputRow>) -> Result<(), Error> {
        let span = Span::current();
        span.pb_set_style(&sumdb_map_tracing::PB_PROGRESS_STYLE);
        span.pb_set_message("Writing tiles");
        span.pb_set_length(rows.len() as u64);

        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let batch: Vec<OutputRow> = rows.by_ref().take(self.config.write_batch_size).collect();
            let batch_len = batch.len();

            self.tile_store
                .put_batch(batch)
                .await
                .map_err(|e| Error::Write {
                    revision,
                    source: e,
                })?;

            span.pb_inc(batch_len as u64);
        }

        Ok(())
    }
}

