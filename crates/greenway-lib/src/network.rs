//! GeoJSON ingestion and the network optimizer.
//!
//! The optimizer turns a raw feature collection into a routing-ready form:
//! only `LineString` features with at least two valid positions and a total
//! great-circle length of at least the configured minimum survive, their
//! properties are stripped, and every coordinate is rounded to a fixed number
//! of decimals. The pass is pure and deterministic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::geo::{polyline_length, Coordinate};

const FEATURE_COLLECTION: &str = "FeatureCollection";
const FEATURE: &str = "Feature";
const LINE_STRING: &str = "LineString";

/// GeoJSON feature collection as fetched from the source. No routing semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<RawFeature>,
}

/// A single GeoJSON feature with arbitrary properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    #[serde(rename = "type", default = "feature_kind")]
    pub kind: String,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
}

/// GeoJSON geometry; coordinates stay untyped until the optimizer inspects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

fn feature_kind() -> String {
    FEATURE.to_string()
}

impl RawFeatureCollection {
    /// Parse GeoJSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let collection: Self =
            serde_json::from_slice(bytes).map_err(|err| Error::InvalidNetwork {
                message: err.to_string(),
            })?;

        if collection.kind != FEATURE_COLLECTION {
            return Err(Error::InvalidNetwork {
                message: format!("expected type {FEATURE_COLLECTION}, found {}", collection.kind),
            });
        }

        Ok(collection)
    }
}

/// Properties-free line feature with rounded coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub coordinates: Vec<Coordinate>,
}

/// Routing-ready network produced by [`NetworkOptimizer`].
///
/// Serializes as a GeoJSON `FeatureCollection` of `LineString`s with empty
/// properties so it can be persisted and reloaded verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawFeatureCollection", try_from = "RawFeatureCollection")]
pub struct OptimizedNetwork {
    pub features: Vec<LineFeature>,
}

impl OptimizedNetwork {
    pub fn new(features: Vec<LineFeature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl From<OptimizedNetwork> for RawFeatureCollection {
    fn from(network: OptimizedNetwork) -> Self {
        let features = network
            .features
            .into_iter()
            .map(|feature| RawFeature {
                kind: FEATURE.to_string(),
                properties: Value::Object(Map::new()),
                geometry: Some(RawGeometry {
                    kind: LINE_STRING.to_string(),
                    coordinates: Value::Array(
                        feature
                            .coordinates
                            .iter()
                            .map(|coordinate| {
                                Value::from(coordinate.to_lng_lat().to_vec())
                            })
                            .collect(),
                    ),
                }),
            })
            .collect();

        RawFeatureCollection {
            kind: FEATURE_COLLECTION.to_string(),
            features,
        }
    }
}

impl TryFrom<RawFeatureCollection> for OptimizedNetwork {
    type Error = Error;

    fn try_from(collection: RawFeatureCollection) -> Result<Self> {
        let mut features = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.iter().enumerate() {
            let coordinates = line_coordinates(feature).ok_or_else(|| Error::InvalidNetwork {
                message: format!("feature {index} is not a valid LineString"),
            })?;
            features.push(LineFeature { coordinates });
        }
        Ok(Self { features })
    }
}

/// Counters describing what the optimizer kept and why it dropped the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimizationReport {
    pub input_features: usize,
    pub kept: usize,
    pub dropped_short: usize,
    pub dropped_invalid: usize,
}

/// Cleans and simplifies raw geometry into a routing-ready network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkOptimizer {
    pub min_length_m: f64,
    pub precision: u32,
}

impl NetworkOptimizer {
    pub fn new(min_length_m: f64, precision: u32) -> Self {
        Self {
            min_length_m,
            precision,
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(config.min_segment_length_m, config.coordinate_precision)
    }

    /// Optimize a raw feature collection. Output never has more features than input.
    pub fn optimize(&self, raw: &RawFeatureCollection) -> (OptimizedNetwork, OptimizationReport) {
        let mut report = OptimizationReport {
            input_features: raw.features.len(),
            ..OptimizationReport::default()
        };
        let mut features = Vec::with_capacity(raw.features.len());

        for (index, feature) in raw.features.iter().enumerate() {
            let Some(coordinates) = line_coordinates(feature) else {
                debug!(feature = index, "skipping feature without usable line geometry");
                report.dropped_invalid += 1;
                continue;
            };

            if polyline_length(&coordinates) < self.min_length_m {
                report.dropped_short += 1;
                continue;
            }

            features.push(LineFeature {
                coordinates: coordinates
                    .into_iter()
                    .map(|coordinate| coordinate.rounded(self.precision))
                    .collect(),
            });
        }

        report.kept = features.len();
        info!(
            input = report.input_features,
            kept = report.kept,
            dropped_short = report.dropped_short,
            dropped_invalid = report.dropped_invalid,
            "optimized road network"
        );

        (OptimizedNetwork { features }, report)
    }
}

/// Extract the positions of a `LineString` feature, or `None` when the
/// feature is not a line, has fewer than two points, or holds a malformed position.
fn line_coordinates(feature: &RawFeature) -> Option<Vec<Coordinate>> {
    let geometry = feature.geometry.as_ref()?;
    if geometry.kind != LINE_STRING {
        return None;
    }

    let positions = geometry.coordinates.as_array()?;
    if positions.len() < 2 {
        return None;
    }

    positions.iter().map(parse_position).collect()
}

fn parse_position(value: &Value) -> Option<Coordinate> {
    let position = value.as_array()?;
    if position.len() < 2 {
        return None;
    }

    let lng = position[0].as_f64()?;
    let lat = position[1].as_f64()?;
    if !lng.is_finite() || !lat.is_finite() {
        return None;
    }

    Some(Coordinate::new(lat, lng))
}
