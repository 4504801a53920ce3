use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Mean Earth radius in metres used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate from a GeoJSON `[lng, lat]` position.
    pub fn from_lng_lat(position: [f64; 2]) -> Self {
        Self {
            lat: position[1],
            lng: position[0],
        }
    }

    /// GeoJSON `[lng, lat]` ordering.
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Great-circle distance to another coordinate in metres.
    pub fn haversine_distance(&self, other: &Self) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Squared distance in raw degree space. Only meaningful for ranking.
    pub fn planar_distance_squared(&self, other: &Self) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_lng = self.lng - other.lng;
        d_lat * d_lat + d_lng * d_lng
    }

    /// Round both components to `precision` decimal places.
    pub fn rounded(self, precision: u32) -> Self {
        Self {
            lat: round_to(self.lat, precision),
            lng: round_to(self.lng, precision),
        }
    }

    /// Quantized identity of this coordinate at `precision` decimals.
    pub fn key(&self, precision: u32) -> NodeKey {
        NodeKey::quantize(*self, precision)
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    /// Parse `"lat,lng"` text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidCoordinate {
            input: s.to_string(),
        };

        let (lat, lng) = s.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(invalid());
        }

        Ok(Self { lat, lng })
    }
}

/// Round a value to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Total great-circle length of a polyline in metres.
pub fn polyline_length(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].haversine_distance(&pair[1]))
        .sum()
}

/// Integer-quantized coordinate used as node identity.
///
/// Two coordinates that round to the same decimals always produce equal keys,
/// which is what collapses shared vertices of different features into one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    lat: i64,
    lng: i64,
    precision: u32,
}

impl NodeKey {
    pub fn quantize(coordinate: Coordinate, precision: u32) -> Self {
        let factor = 10f64.powi(precision as i32);
        Self {
            lat: (coordinate.lat * factor).round() as i64,
            lng: (coordinate.lng * factor).round() as i64,
            precision,
        }
    }

    /// Coordinate at the centre of this quantization cell.
    pub fn coordinate(&self) -> Coordinate {
        let factor = 10f64.powi(self.precision as i32);
        Coordinate {
            lat: self.lat as f64 / factor,
            lng: self.lng as f64 / factor,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coordinate = self.coordinate();
        let precision = self.precision as usize;
        write!(
            f,
            "{:.*},{:.*}",
            precision, coordinate.lat, precision, coordinate.lng
        )
    }
}
