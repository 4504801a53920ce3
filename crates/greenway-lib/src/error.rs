use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the Greenway routing library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// No suitable cache directory could be resolved for this platform.
    #[error("failed to resolve cache directories for the road network")]
    CacheDirsUnavailable,

    /// Raised when the raw road network could not be downloaded.
    #[error("failed to fetch road network from {url}: {message}")]
    FetchFailed { url: String, message: String },

    /// Raised when the downloaded payload is not a GeoJSON feature collection.
    #[error("road network payload is not a valid GeoJSON feature collection: {message}")]
    InvalidNetwork { message: String },

    /// Raised when a query arrives before any initialization completed.
    #[error("routing engine not ready")]
    EngineNotReady,

    /// Raised when the background worker has shut down.
    #[error("routing worker channel closed")]
    WorkerClosed,

    /// Error message reported by the background worker or a background task.
    #[error("routing worker error: {message}")]
    Worker { message: String },

    /// Raised when a `lat,lng` string cannot be parsed.
    #[error("invalid coordinate '{input}'; expected 'lat,lng'")]
    InvalidCoordinate { input: String },

    /// Raised when the closest node lies beyond the configured snap distance.
    #[error("nearest road node is {distance:.1} m away (limit {limit:.1} m)")]
    SnapTooFar { distance: f64, limit: f64 },

    /// Raised when a cache file could not be decoded.
    #[error("cache entry at {path} is corrupted: {message}")]
    CorruptCacheEntry { path: PathBuf, message: String },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
