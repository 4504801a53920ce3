//! Stable, content-derived identifiers for road segments.
//!
//! A segment is one optimized line feature. Its identifier is
//! `SEG_<start node>_<end node>_<digest>`, where the node identifiers are the
//! quantized keys of the feature's first and last coordinates and the digest
//! is the first [`DIGEST_HEX_LEN`] hex characters of the SHA-256 of every
//! coordinate formatted at [`DIGEST_PRECISION`] decimals. Traversing the
//! feature against its stored orientation appends [`REVERSE_SUFFIX`].

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::geo::{Coordinate, NodeKey};
use crate::graph::GraphIndex;
use crate::network::OptimizedNetwork;

pub const SEGMENT_PREFIX: &str = "SEG";
pub const REVERSE_SUFFIX: &str = "_REV";
pub const DIGEST_PRECISION: usize = 6;
pub const DIGEST_HEX_LEN: usize = 16;

/// Identity of a segment traversed in a given direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentId {
    pub start: NodeKey,
    pub end: NodeKey,
    pub digest: String,
    pub reversed: bool,
}

impl SegmentId {
    /// Derive the identity of `polyline` at the given node-key precision.
    ///
    /// Returns `None` for an empty polyline.
    pub fn for_polyline(polyline: &[Coordinate], precision: u32, reversed: bool) -> Option<Self> {
        let first = polyline.first()?;
        let last = polyline.last()?;

        Some(Self {
            start: first.key(precision),
            end: last.key(precision),
            digest: content_digest(polyline),
            reversed,
        })
    }

    /// Identifier without the directional suffix.
    pub fn core(&self) -> String {
        format!(
            "{SEGMENT_PREFIX}_{}_{}_{}",
            self.start, self.end, self.digest
        )
    }

    pub fn reversed(&self) -> Self {
        Self {
            reversed: !self.reversed,
            ..self.clone()
        }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.core())?;
        if self.reversed {
            f.write_str(REVERSE_SUFFIX)?;
        }
        Ok(())
    }
}

/// Truncated hex SHA-256 over the fixed-precision coordinate sequence.
pub fn content_digest(polyline: &[Coordinate]) -> String {
    let mut content = String::with_capacity(polyline.len() * 24);
    for coordinate in polyline {
        content.push_str(&format!(
            "{:.*},{:.*};",
            DIGEST_PRECISION, coordinate.lng, DIGEST_PRECISION, coordinate.lat
        ));
    }

    let digest = Sha256::digest(content.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(DIGEST_HEX_LEN);
    hex
}

/// Converts a coordinate path into the ordered list of segments it traverses.
pub struct EdgeSegmentResolver<'a> {
    graph: &'a GraphIndex,
    network: &'a OptimizedNetwork,
}

impl<'a> EdgeSegmentResolver<'a> {
    pub fn new(graph: &'a GraphIndex, network: &'a OptimizedNetwork) -> Self {
        Self { graph, network }
    }

    /// Resolve every consecutive coordinate pair of `path` to a segment id.
    ///
    /// Consecutive duplicates collapse into one entry. Pairs that have no
    /// backing sub-segment are skipped and resolution continues.
    pub fn resolve(&self, path: &[Coordinate]) -> Vec<String> {
        let precision = self.graph.precision();
        let mut identities: HashMap<usize, SegmentId> = HashMap::new();
        let mut segments: Vec<String> = Vec::new();
        let mut misses = 0usize;

        for pair in path.windows(2) {
            let from = pair[0].key(precision);
            let to = pair[1].key(precision);

            let Some(sub_segment) = self.graph.sub_segment(from, to) else {
                misses += 1;
                debug!(%from, %to, "no sub-segment for path edge; skipping");
                continue;
            };

            let Some(feature) = self.network.features.get(sub_segment.feature) else {
                misses += 1;
                continue;
            };

            let identity = match identities.get(&sub_segment.feature) {
                Some(identity) => identity.clone(),
                None => {
                    let Some(identity) =
                        SegmentId::for_polyline(&feature.coordinates, precision, false)
                    else {
                        misses += 1;
                        continue;
                    };
                    identities.insert(sub_segment.feature, identity.clone());
                    identity
                }
            };

            let id = if sub_segment.reversed {
                identity.reversed().to_string()
            } else {
                identity.to_string()
            };

            if segments.last() != Some(&id) {
                segments.push(id);
            }
        }

        if misses > 0 {
            debug!(misses, resolved = segments.len(), "segment resolution was partial");
        }

        segments
    }
}
