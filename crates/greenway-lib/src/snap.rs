use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::graph::{GraphIndex, NodeId};

/// Outcome of snapping a query coordinate onto the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    /// Matched node, or `None` when the graph has no nodes.
    pub node: Option<NodeId>,
    /// Coordinate of the matched node, or the query point itself on passthrough.
    pub coordinate: Coordinate,
}

/// Resolves arbitrary coordinates to the nearest graph node.
///
/// Ranking uses squared planar distance in degree space, which is adequate at
/// the quantization precision in use. The scan is linear in the node count and
/// runs once per query endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeSnapper {
    /// Reject snaps whose great-circle distance exceeds this many metres.
    pub max_distance_m: Option<f64>,
}

impl NodeSnapper {
    pub fn new(max_distance_m: Option<f64>) -> Self {
        Self { max_distance_m }
    }

    /// Snap `query` to the closest node of `graph`.
    ///
    /// An empty graph returns the query point unchanged. Ties resolve to the
    /// lowest node id.
    pub fn snap(&self, graph: &GraphIndex, query: Coordinate) -> Result<Snap> {
        let nearest = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(id, node)| (id, query.planar_distance_squared(&node.coordinate)))
            .fold(None, |best: Option<(NodeId, f64)>, (id, distance)| match best {
                Some((_, best_distance)) if best_distance <= distance => best,
                _ => Some((id, distance)),
            });

        let Some((id, _)) = nearest else {
            return Ok(Snap {
                node: None,
                coordinate: query,
            });
        };

        let coordinate = graph.nodes()[id].coordinate;
        if let Some(limit) = self.max_distance_m {
            let distance = query.haversine_distance(&coordinate);
            if distance > limit {
                return Err(Error::SnapTooFar { distance, limit });
            }
        }

        Ok(Snap {
            node: Some(id),
            coordinate,
        })
    }
}
