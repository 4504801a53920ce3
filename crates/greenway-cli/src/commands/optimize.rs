//! `optimize`: turn a raw GeoJSON file into a routing-ready network file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use greenway_lib::{
    CacheStore, GraphIndex, NetworkOptimizer, ProcessedNetwork, RawFeatureCollection,
    RoutingConfig,
};

use crate::output::{OptimizeOutput, OutputFormat};

/// Optimize `input` and write the optimized feature collection to `output`.
/// With `store`, the result also seeds the processed cache.
pub fn handle_optimize(
    config: &RoutingConfig,
    input: &Path,
    output: &Path,
    store: bool,
    format: OutputFormat,
) -> Result<()> {
    let bytes =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let raw = RawFeatureCollection::from_slice(&bytes)
        .with_context(|| format!("{} is not a GeoJSON feature collection", input.display()))?;

    let (network, report) = NetworkOptimizer::from_config(config).optimize(&raw);
    let graph = GraphIndex::build(&network, config.coordinate_precision);

    let json = serde_json::to_vec(&network).context("failed to serialize optimized network")?;
    fs::write(output, json).with_context(|| format!("failed to write {}", output.display()))?;

    let stored_in_cache = store
        && CacheStore::from_config(config).processed.save(&ProcessedNetwork {
            nodes_cache: graph.nodes_cache(),
            road_network: network,
        });

    format.render_optimize(&OptimizeOutput {
        input: input.display().to_string(),
        output: output.display().to_string(),
        report,
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        stored_in_cache,
    })?;
    Ok(())
}
