//! `fetch`: warm both cache tiers through the single-flight repository.

use anyhow::{Context, Result};

use greenway_lib::{GraphIndex, RoadNetworkRepository, RoutingConfig};

use crate::output::{FetchOutput, OutputFormat};

/// Load `config.network_url` once, cache-first, and report the resulting graph.
pub async fn handle_fetch(
    config: &RoutingConfig,
    repository: &RoadNetworkRepository,
    format: OutputFormat,
) -> Result<()> {
    let processed = repository
        .load_road_network_once(&config.network_url)
        .await
        .with_context(|| format!("failed to load road network from {}", config.network_url))?;

    let graph = GraphIndex::restore(
        &processed.road_network,
        &processed.nodes_cache,
        config.coordinate_precision,
    );

    format.render_fetch(&FetchOutput {
        url: config.network_url.clone(),
        features: processed.road_network.len(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        cache_dir: config
            .cache_dir
            .as_ref()
            .map(|dir| dir.display().to_string()),
    })?;
    Ok(())
}
