use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::ProcessedNetwork;
use crate::config::RoutingConfig;
use crate::error::Result;
use crate::geo::Coordinate;
use crate::graph::GraphIndex;
use crate::network::{NetworkOptimizer, OptimizationReport, OptimizedNetwork, RawFeatureCollection};
use crate::path::{find_path_a_star, find_path_dijkstra, PathResult};
use crate::segment::EdgeSegmentResolver;
use crate::snap::NodeSnapper;

/// Answer to a single path query, tagged with the caller's request index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub index: u64,
    /// Node coordinates along the path as `[lng, lat]`; empty when unreachable.
    pub path: Vec<[f64; 2]>,
    /// Ordered, deduplicated segment identifiers traversed by `path`.
    pub route_segments: Vec<String>,
    pub start_coords: [f64; 2],
    pub end_coords: [f64; 2],
    pub distance_m: f64,
}

/// Search algorithm used by [`RoutingEngine::find_path_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchAlgorithm {
    #[default]
    AStar,
    Dijkstra,
}

/// One explicitly owned routing instance: optimized network, graph, and snapper.
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    network: OptimizedNetwork,
    graph: GraphIndex,
    snapper: NodeSnapper,
}

impl RoutingEngine {
    /// Build from an already optimized network.
    pub fn from_optimized(network: OptimizedNetwork, config: &RoutingConfig) -> Self {
        let graph = GraphIndex::build(&network, config.coordinate_precision);
        Self {
            network,
            graph,
            snapper: NodeSnapper::new(config.snap_max_distance_m),
        }
    }

    /// Optimize raw geometry and build the graph.
    pub fn from_raw(
        raw: &RawFeatureCollection,
        config: &RoutingConfig,
    ) -> (Self, OptimizationReport) {
        let (network, report) = NetworkOptimizer::from_config(config).optimize(raw);
        (Self::from_optimized(network, config), report)
    }

    /// Restore from a processed cache entry, keeping the cached node order.
    pub fn from_processed(processed: ProcessedNetwork, config: &RoutingConfig) -> Self {
        let graph = GraphIndex::restore(
            &processed.road_network,
            &processed.nodes_cache,
            config.coordinate_precision,
        );
        Self {
            network: processed.road_network,
            graph,
            snapper: NodeSnapper::new(config.snap_max_distance_m),
        }
    }

    /// Snapshot suitable for the processed cache.
    pub fn processed(&self) -> ProcessedNetwork {
        ProcessedNetwork {
            road_network: self.network.clone(),
            nodes_cache: self.graph.nodes_cache(),
        }
    }

    pub fn graph(&self) -> &GraphIndex {
        &self.graph
    }

    pub fn network(&self) -> &OptimizedNetwork {
        &self.network
    }

    /// Snap both endpoints, run A*, and resolve the traversed segments.
    pub fn find_path(&self, start: Coordinate, end: Coordinate, index: u64) -> Result<RouteResult> {
        self.find_path_with(start, end, index, SearchAlgorithm::AStar)
    }

    pub fn find_path_with(
        &self,
        start: Coordinate,
        end: Coordinate,
        index: u64,
        algorithm: SearchAlgorithm,
    ) -> Result<RouteResult> {
        let start_snap = self.snapper.snap(&self.graph, start)?;
        let end_snap = self.snapper.snap(&self.graph, end)?;

        let result = match (start_snap.node, end_snap.node) {
            (Some(from), Some(to)) => match algorithm {
                SearchAlgorithm::AStar => find_path_a_star(&self.graph, from, to),
                SearchAlgorithm::Dijkstra => find_path_dijkstra(&self.graph, from, to),
            },
            _ => PathResult {
                nodes: Vec::new(),
                cost: 0.0,
            },
        };

        let coordinates: Vec<Coordinate> = result
            .nodes
            .iter()
            .filter_map(|&id| self.graph.node(id).map(|node| node.coordinate))
            .collect();
        let route_segments = EdgeSegmentResolver::new(&self.graph, &self.network).resolve(&coordinates);

        debug!(
            index,
            nodes = coordinates.len(),
            segments = route_segments.len(),
            distance_m = result.cost,
            "path query answered"
        );

        Ok(RouteResult {
            index,
            path: coordinates.iter().map(|c| c.to_lng_lat()).collect(),
            route_segments,
            start_coords: start_snap.coordinate.to_lng_lat(),
            end_coords: end_snap.coordinate.to_lng_lat(),
            distance_m: result.cost,
        })
    }
}
