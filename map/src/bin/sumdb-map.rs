use clap::Parser;
use std::sync::Arc;
use sumdb_map::builder::PrefixTileBuilder;
use sumdb_map::{Config, MapRun};
use sumdb_mapdb::{sourcelog, tilestore};
use tracing::{error, info, Level};

/// Constructs a verifiable map from the modules in the Go checksum database,
/// and writes its tiles as a new revision into the map database.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// A global log level to use when printing logs.
    /// It's also possible to set `RUST_LOG` according to
    /// `tracing_subscriber::filter::EnvFilter`, which will always have
    /// priority.
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,

    /// Whether to log in JSON
    #[arg(long)]
    json: bool,

    /// Where to read module versions from, e.g. `sqlite:///var/lib/sumdb/sum.db`
    /// for the database generated by the sumdb auditor.
    #[arg(long, env)]
    sum_db_addr: String,

    /// Where the map tiles are written to.
    #[arg(long, env)]
    map_db_addr: String,

    /// The ID of the tree. Used as a salt in hashing.
    #[arg(long, default_value_t = 12345)]
    tree_id: i64,

    /// The number of 8-bit strata before the final strata.
    #[arg(long, default_value_t = 2)]
    prefix_strata: u8,

    /// Only use the entries with an id below this bound, starting from the
    /// beginning of the log. Uses all entries if unset.
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    count: Option<i64>,

    /// Number of tiles to write per batch.
    #[arg(long, default_value_t = 250)]
    write_batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    sumdb_map_tracing::TracingBuilder::default()
        .level(cli.log_level)
        .json(cli.json)
        .enable_progressbar()
        .build()?;

    let config = Config {
        tree_id: cli.tree_id,
        prefix_strata: cli.prefix_strata,
        count: cli.count,
        write_batch_size: cli.write_batch_size,
    };

    let source_log = sourcelog::from_addr(&cli.sum_db_addr)
        .await
        .inspect_err(|e| error!(err=%e, addr=%cli.sum_db_addr, "failed to open sum_db"))?;
    let tile_store = tilestore::from_addr(&cli.map_db_addr)
        .await
        .inspect_err(|e| error!(err=%e, addr=%cli.map_db_addr, "failed to open map_db"))?;

    let mut run = MapRun::new(
        config,
        source_log,
        tile_store,
        Arc::new(PrefixTileBuilder),
    );

    let summary = run.run().await?;
    info!(
        revision = summary.revision,
        records = summary.records,
        leaves = summary.leaves,
        tiles = summary.tiles,
        "wrote map revision"
    );

    Ok(())
}
