//! Shared fixtures and fakes for integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use greenway_lib::network::LineFeature;
use greenway_lib::{Coordinate, Error, FetchedAsset, Fetcher, OptimizedNetwork, Result};

/// Path to the fixtures directory.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

/// Path to the small Tanta-area GeoJSON network.
pub fn roads_fixture_path() -> PathBuf {
    fixtures_dir().join("roads.geojson")
}

pub fn roads_fixture_bytes() -> Vec<u8> {
    std::fs::read(roads_fixture_path()).expect("read roads fixture")
}

/// Build a line feature from `(lat, lng)` pairs.
pub fn line(points: &[(f64, f64)]) -> LineFeature {
    LineFeature {
        coordinates: points
            .iter()
            .map(|&(lat, lng)| Coordinate::new(lat, lng))
            .collect(),
    }
}

/// A `size` x `size` grid of streets spaced `step` degrees apart, with every
/// other horizontal street bent slightly so edge weights differ.
pub fn grid_network(size: usize, step: f64) -> OptimizedNetwork {
    let mut features = Vec::new();
    for row in 0..size {
        let lat = row as f64 * step;
        let wobble = if row % 2 == 0 { 0.0 } else { step * 0.3 };
        let points: Vec<(f64, f64)> = (0..size)
            .map(|col| {
                let lift = if col % 2 == 1 { wobble } else { 0.0 };
                (round5(lat + lift), round5(col as f64 * step))
            })
            .collect();
        features.push(line(&points));
    }
    for col in 0..size {
        let lng = col as f64 * step;
        for row in 0..size.saturating_sub(1) {
            let lift = |r: usize| {
                if r % 2 == 1 && col % 2 == 1 {
                    step * 0.3
                } else {
                    0.0
                }
            };
            features.push(line(&[
                (round5(row as f64 * step + lift(row)), round5(lng)),
                (round5((row + 1) as f64 * step + lift(row + 1)), round5(lng)),
            ]));
        }
    }
    OptimizedNetwork::new(features)
}

fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

/// Fetcher serving fixed bytes, counting calls, optionally slow or failing.
pub struct CountingFetcher {
    pub calls: AtomicUsize,
    payload: Vec<u8>,
    delay: Duration,
    fail: bool,
}

impl CountingFetcher {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            payload,
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for CountingFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail {
            return Err(Error::FetchFailed {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(FetchedAsset {
            bytes: self.payload.clone(),
            content_type: Some("application/geo+json".to_string()),
        })
    }
}
