use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::geo::{Coordinate, NodeKey};
use crate::network::OptimizedNetwork;
use crate::segment::content_digest;

/// Arena index of a node.
pub type NodeId = usize;

/// Graph vertex representing a deduplicated, quantized road coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub key: NodeKey,
    pub coordinate: Coordinate,
}

/// Directed arc towards `target`, weighted by great-circle distance in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub target: NodeId,
    pub distance: f64,
}

/// Backing geometry for a directed node pair: the owning feature and whether
/// the pair runs against the feature's stored orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubSegment {
    pub feature: usize,
    pub reversed: bool,
}

/// Node table, weighted adjacency, and sub-segment edge map built from an
/// [`OptimizedNetwork`].
///
/// Nodes live in a growable array addressed by [`NodeId`]; coordinate keys are
/// only consulted at ingestion and lookup boundaries. Parallel edges between
/// the same pair are kept as separate entries.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    precision: u32,
    nodes: Vec<Node>,
    adjacency: Vec<Vec<Edge>>,
    key_to_node: HashMap<NodeKey, NodeId>,
    sub_segments: HashMap<(NodeKey, NodeKey), SubSegment>,
}

impl GraphIndex {
    /// Build the graph in one pass over every feature's consecutive coordinate pairs.
    pub fn build(network: &OptimizedNetwork, precision: u32) -> Self {
        let mut graph = Self::empty(precision);
        graph.add_network(network);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built road graph"
        );
        graph
    }

    /// Rebuild from a processed cache entry. The node arena is seeded from
    /// `nodes_cache` (GeoJSON `[lng, lat]` order) so node ids match the session
    /// that produced the cache, then edges are replayed from the network.
    pub fn restore(network: &OptimizedNetwork, nodes_cache: &[[f64; 2]], precision: u32) -> Self {
        let mut graph = Self::empty(precision);
        for position in nodes_cache {
            graph.intern(Coordinate::from_lng_lat(*position));
        }
        let seeded = graph.node_count();

        graph.add_network(network);
        if graph.node_count() != seeded {
            warn!(
                cached = seeded,
                rebuilt = graph.node_count(),
                "cached node index did not cover the road network"
            );
        }
        graph
    }

    fn empty(precision: u32) -> Self {
        Self {
            precision,
            ..Self::default()
        }
    }

    fn add_network(&mut self, network: &OptimizedNetwork) {
        for (feature_index, feature) in network.features.iter().enumerate() {
            for pair in feature.coordinates.windows(2) {
                let from = self.intern(pair[0]);
                let to = self.intern(pair[1]);
                if from == to {
                    continue;
                }

                let distance = self.nodes[from]
                    .coordinate
                    .haversine_distance(&self.nodes[to].coordinate);
                self.adjacency[from].push(Edge {
                    target: to,
                    distance,
                });
                self.adjacency[to].push(Edge {
                    target: from,
                    distance,
                });

                let from_key = self.nodes[from].key;
                let to_key = self.nodes[to].key;
                self.record_sub_segment(
                    network,
                    (from_key, to_key),
                    SubSegment {
                        feature: feature_index,
                        reversed: false,
                    },
                );
                self.record_sub_segment(
                    network,
                    (to_key, from_key),
                    SubSegment {
                        feature: feature_index,
                        reversed: true,
                    },
                );
            }
        }
    }

    /// When several features back the same directed pair, the one with the
    /// smallest content digest wins, forward before reversed.
    fn record_sub_segment(
        &mut self,
        network: &OptimizedNetwork,
        pair: (NodeKey, NodeKey),
        candidate: SubSegment,
    ) {
        match self.sub_segments.entry(pair) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                let current = *slot.get();
                if current == candidate {
                    return;
                }
                let rank = |sub: SubSegment| {
                    let digest = network
                        .features
                        .get(sub.feature)
                        .map(|feature| content_digest(&feature.coordinates))
                        .unwrap_or_default();
                    (digest, sub.reversed)
                };
                if rank(candidate) < rank(current) {
                    slot.insert(candidate);
                }
            }
        }
    }

    fn intern(&mut self, coordinate: Coordinate) -> NodeId {
        let key = coordinate.key(self.precision);
        if let Some(&id) = self.key_to_node.get(&key) {
            return id;
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            key,
            coordinate: key.coordinate(),
        });
        self.adjacency.push(Vec::new());
        self.key_to_node.insert(key, id);
        id
    }

    /// Decimal precision used to quantize node keys.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edges (twice the number of physical connections).
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Return the outgoing edges of a node.
    pub fn neighbours(&self, id: NodeId) -> &[Edge] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up the node sitting at `coordinate` after quantization.
    pub fn node_at(&self, coordinate: Coordinate) -> Option<NodeId> {
        self.key_to_node
            .get(&coordinate.key(self.precision))
            .copied()
    }

    /// Backing geometry of the directed pair `from -> to`, if any feature provides it.
    pub fn sub_segment(&self, from: NodeKey, to: NodeKey) -> Option<SubSegment> {
        self.sub_segments.get(&(from, to)).copied()
    }

    pub fn sub_segment_count(&self) -> usize {
        self.sub_segments.len()
    }

    /// Node coordinates in arena order, as `[lng, lat]` pairs for the processed cache.
    pub fn nodes_cache(&self) -> Vec<[f64; 2]> {
        self.nodes
            .iter()
            .map(|node| node.coordinate.to_lng_lat())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::LineFeature;

    fn line(points: &[(f64, f64)]) -> LineFeature {
        LineFeature {
            coordinates: points
                .iter()
                .map(|&(lat, lng)| Coordinate::new(lat, lng))
                .collect(),
        }
    }

    #[test]
    fn shared_vertices_collapse_into_one_node() {
        let network = OptimizedNetwork::new(vec![
            line(&[(0.0, 0.0), (0.0, 1.0)]),
            line(&[(0.0, 1.0), (1.0, 1.0)]),
        ]);
        let graph = GraphIndex::build(&network, 5);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 4);
        let junction = graph
            .node_at(Coordinate::new(0.0, 1.0))
            .expect("junction exists");
        assert_eq!(graph.neighbours(junction).len(), 2);
    }

    #[test]
    fn parallel_edges_are_not_merged() {
        let network = OptimizedNetwork::new(vec![
            line(&[(0.0, 0.0), (0.0, 1.0)]),
            line(&[(0.0, 0.0), (0.0, 1.0)]),
        ]);
        let graph = GraphIndex::build(&network, 5);
        let start = graph.node_at(Coordinate::new(0.0, 0.0)).unwrap();
        assert_eq!(graph.neighbours(start).len(), 2);
    }

    #[test]
    fn sub_segments_record_direction() {
        let network = OptimizedNetwork::new(vec![line(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)])]);
        let graph = GraphIndex::build(&network, 5);
        let a = Coordinate::new(0.0, 0.0).key(5);
        let b = Coordinate::new(0.0, 1.0).key(5);

        assert_eq!(
            graph.sub_segment(a, b),
            Some(SubSegment {
                feature: 0,
                reversed: false
            })
        );
        assert_eq!(
            graph.sub_segment(b, a),
            Some(SubSegment {
                feature: 0,
                reversed: true
            })
        );
        assert_eq!(graph.sub_segment_count(), 4);
    }

    #[test]
    fn shared_pair_owner_ignores_feature_order() {
        let short = line(&[(0.0, 0.0), (0.0, 1.0)]);
        let long = line(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
        let forward = OptimizedNetwork::new(vec![short.clone(), long.clone()]);
        let backward = OptimizedNetwork::new(vec![long, short]);

        let a = Coordinate::new(0.0, 0.0).key(5);
        let b = Coordinate::new(0.0, 1.0).key(5);
        let owner = |network: &OptimizedNetwork| {
            let graph = GraphIndex::build(network, 5);
            let sub = graph.sub_segment(a, b).expect("pair is backed");
            (
                content_digest(&network.features[sub.feature].coordinates),
                sub.reversed,
            )
        };

        assert_eq!(owner(&forward), owner(&backward));
    }

    #[test]
    fn restore_preserves_cached_node_order() {
        let network = OptimizedNetwork::new(vec![line(&[(0.0, 0.0), (0.0, 1.0)])]);
        let nodes_cache = vec![[1.0, 0.0], [0.0, 0.0]];
        let graph = GraphIndex::restore(&network, &nodes_cache, 5);

        assert_eq!(graph.node_at(Coordinate::new(0.0, 1.0)), Some(0));
        assert_eq!(graph.node_at(Coordinate::new(0.0, 0.0)), Some(1));
        assert_eq!(graph.nodes_cache(), nodes_cache);
    }

    #[test]
    fn degenerate_pairs_do_not_create_self_loops() {
        let network = OptimizedNetwork::new(vec![line(&[(0.0, 0.0), (0.0, 0.0), (0.0, 1.0)])]);
        let graph = GraphIndex::build(&network, 5);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
    }
}
