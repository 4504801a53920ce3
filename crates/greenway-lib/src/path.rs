use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::graph::{GraphIndex, NodeId};

/// Outcome of a shortest-path search.
///
/// An empty `nodes` list means the goal is unreachable. That is a valid
/// result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub nodes: Vec<NodeId>,
    /// Total great-circle length of the path in metres.
    pub cost: f64,
}

impl PathResult {
    fn not_found() -> Self {
        Self {
            nodes: Vec::new(),
            cost: 0.0,
        }
    }

    pub fn is_found(&self) -> bool {
        !self.nodes.is_empty()
    }
}

/// Run A* from `start` to `goal`.
///
/// The heuristic is the great-circle distance to the goal, which never
/// overestimates because edge weights are great-circle distances too. The open
/// set is a binary heap keyed by f-score; equal f-scores pop in insertion
/// order so repeated searches return identical paths.
pub fn find_path_a_star(graph: &GraphIndex, start: NodeId, goal: NodeId) -> PathResult {
    let (Some(_), Some(goal_node)) = (graph.node(start), graph.node(goal)) else {
        return PathResult::not_found();
    };
    let goal_coordinate = goal_node.coordinate;
    let heuristic = |id: NodeId| {
        graph
            .node(id)
            .map(|node| node.coordinate.haversine_distance(&goal_coordinate))
            .unwrap_or(0.0)
    };

    search(graph, start, goal, heuristic)
}

/// Run Dijkstra's algorithm from `start` to `goal`. Equivalent to A* with a zero heuristic.
pub fn find_path_dijkstra(graph: &GraphIndex, start: NodeId, goal: NodeId) -> PathResult {
    if graph.node(start).is_none() || graph.node(goal).is_none() {
        return PathResult::not_found();
    }

    search(graph, start, goal, |_| 0.0)
}

fn search<H>(graph: &GraphIndex, start: NodeId, goal: NodeId, heuristic: H) -> PathResult
where
    H: Fn(NodeId) -> f64,
{
    if start == goal {
        return PathResult {
            nodes: vec![start],
            cost: 0.0,
        };
    }

    let node_count = graph.node_count();
    let mut g_score = vec![f64::INFINITY; node_count];
    let mut parents: Vec<Option<NodeId>> = vec![None; node_count];
    let mut closed = vec![false; node_count];
    let mut open = BinaryHeap::new();
    let mut sequence = 0u64;

    g_score[start] = 0.0;
    open.push(OpenEntry::new(start, 0.0, heuristic(start), sequence));

    while let Some(entry) = open.pop() {
        let current = entry.node;
        if closed[current] || entry.cost.0 > g_score[current] {
            continue;
        }

        if current == goal {
            return PathResult {
                nodes: reconstruct_path(&parents, start, goal),
                cost: g_score[goal],
            };
        }

        closed[current] = true;
        let current_score = g_score[current];

        for edge in graph.neighbours(current) {
            let next = edge.target;
            let tentative = current_score + edge.distance;
            if tentative < g_score[next] {
                g_score[next] = tentative;
                parents[next] = Some(current);
                closed[next] = false;
                sequence += 1;
                open.push(OpenEntry::new(next, tentative, heuristic(next), sequence));
            }
        }
    }

    PathResult::not_found()
}

fn reconstruct_path(parents: &[Option<NodeId>], start: NodeId, goal: NodeId) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut current = Some(goal);
    while let Some(node) = current {
        path.push(node);
        if node == start {
            break;
        }
        current = parents[node];
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct OpenEntry {
    node: NodeId,
    cost: FloatOrd,
    estimate: FloatOrd,
    sequence: u64,
}

impl OpenEntry {
    fn new(node: NodeId, cost: f64, heuristic: f64, sequence: u64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
            estimate: FloatOrd(cost + heuristic),
            sequence,
        }
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by estimate, then by age.
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::network::{LineFeature, OptimizedNetwork};

    fn line(points: &[(f64, f64)]) -> LineFeature {
        LineFeature {
            coordinates: points
                .iter()
                .map(|&(lat, lng)| Coordinate::new(lat, lng))
                .collect(),
        }
    }

    fn node(graph: &GraphIndex, lat: f64, lng: f64) -> NodeId {
        graph.node_at(Coordinate::new(lat, lng)).expect("node exists")
    }

    #[test]
    fn finds_straight_line_path() {
        let network = OptimizedNetwork::new(vec![line(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)])]);
        let graph = GraphIndex::build(&network, 5);
        let a = node(&graph, 0.0, 0.0);
        let b = node(&graph, 0.0, 1.0);
        let c = node(&graph, 0.0, 2.0);

        let result = find_path_a_star(&graph, a, c);
        assert_eq!(result.nodes, vec![a, b, c]);

        let ab = Coordinate::new(0.0, 0.0).haversine_distance(&Coordinate::new(0.0, 1.0));
        let bc = Coordinate::new(0.0, 1.0).haversine_distance(&Coordinate::new(0.0, 2.0));
        assert!((result.cost - (ab + bc)).abs() < 1e-6);
    }

    #[test]
    fn prefers_shorter_detour() {
        // A-B-C versus the longer A-D-E-C.
        let network = OptimizedNetwork::new(vec![
            line(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]),
            line(&[(0.0, 0.0), (-1.0, 0.0), (-1.0, 2.0), (1.0, 1.0)]),
        ]);
        let graph = GraphIndex::build(&network, 5);
        let start = node(&graph, 0.0, 0.0);
        let goal = node(&graph, 1.0, 1.0);

        let result = find_path_a_star(&graph, start, goal);
        assert_eq!(result.nodes.len(), 3);
    }

    #[test]
    fn unreachable_goal_returns_empty_path() {
        let network = OptimizedNetwork::new(vec![
            line(&[(0.0, 0.0), (0.0, 1.0)]),
            line(&[(5.0, 5.0), (5.0, 6.0)]),
        ]);
        let graph = GraphIndex::build(&network, 5);
        let result = find_path_a_star(&graph, node(&graph, 0.0, 0.0), node(&graph, 5.0, 6.0));
        assert!(!result.is_found());
        assert!(result.nodes.is_empty());
    }

    #[test]
    fn same_start_and_goal_is_single_node() {
        let network = OptimizedNetwork::new(vec![line(&[(0.0, 0.0), (0.0, 1.0)])]);
        let graph = GraphIndex::build(&network, 5);
        let a = node(&graph, 0.0, 0.0);
        let result = find_path_a_star(&graph, a, a);
        assert_eq!(result.nodes, vec![a]);
        assert_eq!(result.cost, 0.0);
    }

    #[test]
    fn unknown_nodes_return_empty_path() {
        let network = OptimizedNetwork::new(vec![line(&[(0.0, 0.0), (0.0, 1.0)])]);
        let graph = GraphIndex::build(&network, 5);
        assert!(!find_path_a_star(&graph, 0, 99).is_found());
        assert!(!find_path_dijkstra(&graph, 99, 0).is_found());
    }

    #[test]
    fn repeated_searches_are_identical() {
        // Two equal-length routes around a symmetric diamond.
        let network = OptimizedNetwork::new(vec![
            line(&[(0.0, 0.0), (1.0, 1.0), (0.0, 2.0)]),
            line(&[(0.0, 0.0), (-1.0, 1.0), (0.0, 2.0)]),
        ]);
        let graph = GraphIndex::build(&network, 5);
        let start = node(&graph, 0.0, 0.0);
        let goal = node(&graph, 0.0, 2.0);

        let first = find_path_a_star(&graph, start, goal);
        for _ in 0..10 {
            assert_eq!(find_path_a_star(&graph, start, goal), first);
        }
    }
}
