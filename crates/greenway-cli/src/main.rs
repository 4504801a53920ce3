use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use greenway_cli::commands::{cache, fetch, optimize, route};
use greenway_cli::output::OutputFormat;
use greenway_lib::cache::default_cache_dir;
use greenway_lib::{
    CacheStore, Coordinate, Fetcher, HttpFetcher, RoadNetworkRepository, RoutingConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Greenway offline road-network routing")]
struct Cli {
    /// Override the cache directory (defaults to GREENWAY_CACHE_DIR or the platform cache dir).
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Source URL of the raw GeoJSON road network.
    #[arg(long, global = true)]
    url: Option<String>,

    /// Drop features shorter than this many metres.
    #[arg(long, global = true)]
    min_segment_length: Option<f64>,

    /// Reject endpoints farther than this many metres from the nearest road node.
    #[arg(long, global = true)]
    snap_max_distance: Option<f64>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download and process the road network, filling both cache tiers.
    Fetch,
    /// Optimize a raw GeoJSON file into a routing-ready network.
    Optimize {
        /// Raw GeoJSON feature collection.
        #[arg(long)]
        input: PathBuf,
        /// Destination for the optimized feature collection.
        #[arg(long)]
        output: PathBuf,
        /// Also store the result in the processed cache.
        #[arg(long)]
        store: bool,
    },
    /// Find a path between two `lat,lng` coordinates.
    Route {
        #[arg(long = "from")]
        from: Coordinate,
        #[arg(long = "to")]
        to: Coordinate,
    },
    /// Inspect or clear the on-disk caches.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Report the processed cache entry.
    Info,
    /// Remove both cache tiers.
    Clear,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli);

    match cli.command {
        Command::Fetch => {
            let repository = RoadNetworkRepository::new(
                config.clone(),
                CacheStore::from_config(&config),
                http_fetcher()?,
            );
            let runtime = runtime()?;
            runtime.block_on(fetch::handle_fetch(&config, &repository, cli.format))
        }
        Command::Optimize {
            input,
            output,
            store,
        } => optimize::handle_optimize(&config, &input, &output, store, cli.format),
        Command::Route { from, to } => {
            let fetcher = http_fetcher()?;
            let runtime = runtime()?;
            runtime.block_on(route::handle_route(&config, fetcher, from, to, cli.format))
        }
        Command::Cache { action } => match action {
            CacheAction::Info => cache::handle_cache_info(&config, cli.format),
            CacheAction::Clear => cache::handle_cache_clear(&config),
        },
    }
}

// Blocking HTTP clients are built and dropped outside the async runtime.
fn http_fetcher() -> Result<Arc<dyn Fetcher>> {
    Ok(Arc::new(HttpFetcher::new().context("failed to build HTTP client")?))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .build()
        .context("failed to start async runtime")
}

/// Environment first, then command-line overrides.
fn resolve_config(cli: &Cli) -> RoutingConfig {
    let mut config = RoutingConfig::from_env();
    if let Some(dir) = &cli.cache_dir {
        config = config.with_cache_dir(dir);
    }
    if config.cache_dir.is_none() {
        config.cache_dir = default_cache_dir().ok();
    }
    if let Some(url) = &cli.url {
        config = config.with_network_url(url);
    }
    if let Some(min) = cli.min_segment_length {
        config.min_segment_length_m = min;
    }
    if cli.snap_max_distance.is_some() {
        config.snap_max_distance_m = cli.snap_max_distance;
    }
    config
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|value| value.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr);

    let _ = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
}
