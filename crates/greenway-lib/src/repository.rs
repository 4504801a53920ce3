use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::cache::{CacheStore, ProcessedNetwork, RawAssetCache};
use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::fetch::{fetch_network, Fetcher};
use crate::graph::GraphIndex;
use crate::network::{NetworkOptimizer, OptimizedNetwork};

/// Fetch the raw network through the raw asset cache and optimize it.
pub fn fetch_optimized(
    fetcher: &dyn Fetcher,
    raw_cache: &RawAssetCache,
    url: &str,
    config: &RoutingConfig,
) -> Result<OptimizedNetwork> {
    let raw = fetch_network(fetcher, raw_cache, url)?;
    let (network, _) = NetworkOptimizer::from_config(config).optimize(&raw);
    Ok(network)
}

/// Single-flight loader that memoizes one processed network per instance.
///
/// The first caller runs the processed-cache check, fetch, and optimize
/// pipeline; concurrent callers wait on the same in-flight load. A failed
/// load leaves nothing memoized, so a later call retries. The URL of the first
/// successful load wins for the lifetime of the repository.
pub struct RoadNetworkRepository {
    config: RoutingConfig,
    cache: CacheStore,
    fetcher: Arc<dyn Fetcher>,
    network: OnceCell<Arc<ProcessedNetwork>>,
}

impl RoadNetworkRepository {
    pub fn new(config: RoutingConfig, cache: CacheStore, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            cache,
            fetcher,
            network: OnceCell::new(),
        }
    }

    /// Load the network once; every later or concurrent call shares the result.
    pub async fn load_road_network_once(&self, url: &str) -> Result<Arc<ProcessedNetwork>> {
        self.network
            .get_or_try_init(|| self.load(url.to_string()))
            .await
            .cloned()
    }

    /// The memoized network, if a load already completed.
    pub fn loaded(&self) -> Option<Arc<ProcessedNetwork>> {
        self.network.get().cloned()
    }

    async fn load(&self, url: String) -> Result<Arc<ProcessedNetwork>> {
        let config = self.config.clone();
        let cache = self.cache.clone();
        let fetcher = Arc::clone(&self.fetcher);

        let processed = tokio::task::spawn_blocking(move || -> Result<ProcessedNetwork> {
            if let Some(processed) = cache.processed.load() {
                return Ok(processed);
            }

            let network = fetch_optimized(fetcher.as_ref(), &cache.raw, &url, &config)?;
            let graph = GraphIndex::build(&network, config.coordinate_precision);
            let processed = ProcessedNetwork {
                road_network: network,
                nodes_cache: graph.nodes_cache(),
            };
            cache.processed.save(&processed);
            info!(
                %url,
                features = processed.road_network.len(),
                nodes = processed.nodes_cache.len(),
                "road network loaded"
            );
            Ok(processed)
        })
        .await
        .map_err(|err| Error::Worker {
            message: err.to_string(),
        })??;

        Ok(Arc::new(processed))
    }
}
