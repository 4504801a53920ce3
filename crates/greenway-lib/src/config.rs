//! Runtime configuration for the routing engine.
//!
//! # Environment Variables
//!
//! - `GREENWAY_NETWORK_URL`: Source URL of the raw GeoJSON road network
//! - `GREENWAY_CACHE_DIR`: Directory holding both cache tiers
//! - `GREENWAY_MIN_SEGMENT_LENGTH`: Minimum feature length in metres (default `0`)
//! - `GREENWAY_COORDINATE_PRECISION`: Decimal places kept per coordinate (default `5`, at most `9`)
//! - `GREENWAY_SNAP_MAX_DISTANCE`: Reject snaps farther than this many metres (unset = always snap)

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default source of the raw road network.
pub const DEFAULT_NETWORK_URL: &str = "http://localhost:8081/roads.geojson";

/// Five decimals is roughly 1.1 m at the equator.
pub const DEFAULT_COORDINATE_PRECISION: u32 = 5;

/// Largest accepted precision. Quantized keys must fit in `i64` and the
/// scale factor must stay finite.
pub const MAX_COORDINATE_PRECISION: u32 = 9;

const NETWORK_URL_ENV: &str = "GREENWAY_NETWORK_URL";
const CACHE_DIR_ENV: &str = "GREENWAY_CACHE_DIR";
const MIN_SEGMENT_LENGTH_ENV: &str = "GREENWAY_MIN_SEGMENT_LENGTH";
const COORDINATE_PRECISION_ENV: &str = "GREENWAY_COORDINATE_PRECISION";
const SNAP_MAX_DISTANCE_ENV: &str = "GREENWAY_SNAP_MAX_DISTANCE";

/// Options shared by the optimizer, graph builder, snapper, and caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Features shorter than this (metres) are discarded by the optimizer.
    pub min_segment_length_m: f64,
    /// Decimal places kept for every coordinate.
    pub coordinate_precision: u32,
    /// Maximum snap distance in metres; `None` always snaps.
    pub snap_max_distance_m: Option<f64>,
    /// Explicit cache directory; `None` resolves the platform cache dir.
    pub cache_dir: Option<PathBuf>,
    /// Source of the raw road network.
    pub network_url: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_segment_length_m: 0.0,
            coordinate_precision: DEFAULT_COORDINATE_PRECISION,
            snap_max_distance_m: None,
            cache_dir: None,
            network_url: DEFAULT_NETWORK_URL.to_string(),
        }
    }
}

impl RoutingConfig {
    /// Create configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            min_segment_length_m: parse_env(MIN_SEGMENT_LENGTH_ENV)
                .unwrap_or(defaults.min_segment_length_m),
            coordinate_precision: parse_env(COORDINATE_PRECISION_ENV)
                .and_then(checked_precision)
                .unwrap_or(defaults.coordinate_precision),
            snap_max_distance_m: parse_env(SNAP_MAX_DISTANCE_ENV),
            cache_dir: env::var_os(CACHE_DIR_ENV).map(PathBuf::from),
            network_url: env::var(NETWORK_URL_ENV).unwrap_or(defaults.network_url),
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_network_url(mut self, url: impl Into<String>) -> Self {
        self.network_url = url.into();
        self
    }
}

fn checked_precision(precision: u32) -> Option<u32> {
    if precision > MAX_COORDINATE_PRECISION {
        warn!(
            variable = COORDINATE_PRECISION_ENV,
            precision,
            max = MAX_COORDINATE_PRECISION,
            "ignoring out-of-range coordinate precision"
        );
        return None;
    }
    Some(precision)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
