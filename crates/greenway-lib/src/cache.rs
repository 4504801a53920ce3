//! On-disk cache tiers for the road network.
//!
//! Two independent collaborators with different contracts:
//!
//! - [`RawAssetCache`] stores fetched bytes addressed by the SHA-256 of their
//!   source URL, next to a small JSON metadata record. It survives rebuilds of
//!   the processed graph.
//! - [`ProcessedCache`] holds a single versioned slot containing the optimized
//!   network and its node index as gzip-compressed JSON.
//!
//! Every read or write failure is logged and degrades to a miss or a no-op.
//! Nothing in this module returns an error to the caller.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use directories::ProjectDirs;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::network::OptimizedNetwork;

/// Schema version of the processed-cache payload. Bump whenever the layout changes.
pub const PROCESSED_SCHEMA_VERSION: &str = "1.0";

const RAW_DIR_NAME: &str = "raw";
const PROCESSED_FILE_NAME: &str = "processed-roads.json.gz";

/// Persisted wrapper: schema version, write time in epoch milliseconds, payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope<T> {
    pub v: String,
    pub t: u64,
    pub data: T,
}

/// Fully processed network as stored in the processed cache and exchanged
/// over the worker channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedNetwork {
    pub road_network: OptimizedNetwork,
    /// Node coordinates in node-index order, `[lng, lat]`.
    pub nodes_cache: Vec<[f64; 2]>,
}

/// Summary of the processed slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheInfo {
    pub exists: bool,
    pub version: Option<String>,
    pub timestamp: Option<u64>,
    pub size_bytes: u64,
}

/// Metadata written beside every raw asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAssetMetadata {
    pub url: String,
    pub fetched_at: u64,
    pub size_bytes: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Both cache tiers rooted at one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    pub raw: RawAssetCache,
    pub processed: ProcessedCache,
}

impl CacheStore {
    /// Open the cache rooted at `root`.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            raw: RawAssetCache::new(Some(root.join(RAW_DIR_NAME))),
            processed: ProcessedCache::new(Some(root.join(PROCESSED_FILE_NAME))),
        }
    }

    /// A cache that never hits and never writes.
    pub fn disabled() -> Self {
        Self {
            raw: RawAssetCache::new(None),
            processed: ProcessedCache::new(None),
        }
    }

    /// Resolve the cache directory from configuration, falling back to the
    /// platform cache directory. If neither is available the cache is disabled.
    pub fn from_config(config: &RoutingConfig) -> Self {
        let root = match &config.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_cache_dir(),
        };

        match root {
            Ok(root) => {
                debug!(path = %root.display(), "using road network cache directory");
                Self::at(root)
            }
            Err(error) => {
                warn!(%error, "road network caching disabled");
                Self::disabled()
            }
        }
    }

    /// Remove every entry from both tiers.
    pub fn clear(&self) {
        self.raw.clear();
        self.processed.clear();
    }
}

/// Platform-specific cache directory for the road network.
pub fn default_cache_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("com", "greenway", "greenway").ok_or(Error::CacheDirsUnavailable)?;
    Ok(dirs.cache_dir().to_path_buf())
}

/// Unprocessed fetched bytes, content-addressed by source URL.
#[derive(Debug, Clone)]
pub struct RawAssetCache {
    dir: Option<PathBuf>,
}

impl RawAssetCache {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    fn paths(&self, url: &str) -> Option<(PathBuf, PathBuf)> {
        let dir = self.dir.as_ref()?;
        let name = url_key(url);
        Some((
            dir.join(format!("{name}.bin")),
            dir.join(format!("{name}.meta.json")),
        ))
    }

    /// Cached bytes for `url`, or `None` on miss or any read failure.
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let (data_path, _) = self.paths(url)?;
        if !data_path.exists() {
            debug!(%url, "raw asset cache miss");
            return None;
        }

        match fs::read(&data_path) {
            Ok(bytes) => {
                info!(%url, bytes = bytes.len(), "raw asset cache hit");
                Some(bytes)
            }
            Err(error) => {
                warn!(%error, path = %data_path.display(), "failed to read raw asset cache");
                None
            }
        }
    }

    /// Metadata recorded for `url`, if present and readable.
    pub fn metadata(&self, url: &str) -> Option<RawAssetMetadata> {
        let (_, meta_path) = self.paths(url)?;
        let bytes = fs::read(meta_path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Store `bytes` for `url`. Failures are logged and ignored.
    pub fn put(&self, url: &str, bytes: &[u8], content_type: Option<&str>) {
        let Some((data_path, meta_path)) = self.paths(url) else {
            return;
        };

        let metadata = RawAssetMetadata {
            url: url.to_string(),
            fetched_at: now_millis(),
            size_bytes: bytes.len() as u64,
            content_type: content_type.map(str::to_string),
        };

        let result = write_atomic(&data_path, bytes).and_then(|()| {
            let meta = serde_json::to_vec_pretty(&metadata)?;
            write_atomic(&meta_path, &meta)
        });

        match result {
            Ok(()) => debug!(%url, bytes = bytes.len(), "stored raw asset"),
            Err(error) => warn!(%error, %url, "failed to write raw asset cache"),
        }
    }

    /// Drop the entry for `url`. Missing files are not an error.
    pub fn remove(&self, url: &str) {
        let Some((data_path, meta_path)) = self.paths(url) else {
            return;
        };
        for path in [data_path, meta_path] {
            if path.exists() {
                if let Err(error) = fs::remove_file(&path) {
                    warn!(%error, path = %path.display(), "failed to evict raw asset");
                }
            }
        }
    }

    pub fn clear(&self) {
        let Some(dir) = &self.dir else {
            return;
        };
        if dir.exists() {
            if let Err(error) = fs::remove_dir_all(dir) {
                warn!(%error, path = %dir.display(), "failed to clear raw asset cache");
            }
        }
    }
}

/// Single versioned slot holding the processed network.
#[derive(Debug, Clone)]
pub struct ProcessedCache {
    path: Option<PathBuf>,
    version: String,
}

impl ProcessedCache {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            version: PROCESSED_SCHEMA_VERSION.to_string(),
        }
    }

    /// Use a schema version other than [`PROCESSED_SCHEMA_VERSION`].
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Read the slot. A version mismatch is indistinguishable from an absent entry.
    pub fn load(&self) -> Option<ProcessedNetwork> {
        let path = self.path.as_ref()?;
        if !path.exists() {
            debug!(path = %path.display(), "processed cache miss");
            return None;
        }

        let envelope: CacheEnvelope<serde_json::Value> = match read_compressed(path) {
            Ok(envelope) => envelope,
            Err(error @ Error::CorruptCacheEntry { .. }) => {
                warn!(%error, "processed cache is corrupted; discarding it");
                self.clear();
                return None;
            }
            Err(error) => {
                warn!(%error, path = %path.display(), "processed cache could not be read");
                return None;
            }
        };

        if envelope.v != self.version {
            info!(
                cached = %envelope.v,
                current = %self.version,
                "processed cache version mismatch"
            );
            return None;
        }

        match serde_json::from_value::<ProcessedNetwork>(envelope.data) {
            Ok(processed) => {
                info!(
                    features = processed.road_network.len(),
                    nodes = processed.nodes_cache.len(),
                    "processed cache hit"
                );
                Some(processed)
            }
            Err(error) => {
                warn!(%error, "processed cache payload is malformed; discarding it");
                self.clear();
                None
            }
        }
    }

    /// Overwrite the slot. Returns `true` when the entry was persisted.
    pub fn save(&self, processed: &ProcessedNetwork) -> bool {
        let Some(path) = &self.path else {
            return false;
        };

        let envelope = CacheEnvelope {
            v: self.version.clone(),
            t: now_millis(),
            data: processed,
        };

        match write_compressed(path, &envelope) {
            Ok(size) => {
                info!(path = %path.display(), bytes = size, "saved processed road network");
                true
            }
            Err(error) => {
                warn!(%error, path = %path.display(), "failed to write processed cache");
                false
            }
        }
    }

    pub fn info(&self) -> CacheInfo {
        let missing = CacheInfo {
            exists: false,
            version: None,
            timestamp: None,
            size_bytes: 0,
        };
        let Some(path) = &self.path else {
            return missing;
        };
        let Ok(metadata) = fs::metadata(path) else {
            return missing;
        };

        match read_compressed::<CacheEnvelope<serde_json::Value>>(path) {
            Ok(envelope) => CacheInfo {
                exists: true,
                version: Some(envelope.v),
                timestamp: Some(envelope.t),
                size_bytes: metadata.len(),
            },
            Err(_) => CacheInfo {
                exists: true,
                version: None,
                timestamp: None,
                size_bytes: metadata.len(),
            },
        }
    }

    pub fn clear(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if path.exists() {
            if let Err(error) = fs::remove_file(path) {
                warn!(%error, path = %path.display(), "failed to clear processed cache");
            }
        }
    }
}

fn url_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// IO failures surface as [`Error::Io`]; anything that reads but does not
/// decode is an [`Error::CorruptCacheEntry`].
fn read_compressed<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let compressed = fs::read(path)?;
    let corrupt = |message: String| Error::CorruptCacheEntry {
        path: path.to_path_buf(),
        message,
    };

    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|err| corrupt(err.to_string()))?;
    serde_json::from_slice(&json).map_err(|err| corrupt(err.to_string()))
}

fn write_compressed<T: Serialize>(path: &Path, value: &T) -> Result<usize> {
    let json = serde_json::to_vec(value)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    write_atomic(path, &compressed)?;
    Ok(compressed.len())
}

fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<()> {
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(destination).map_err(|err| err.error)?;
    Ok(())
}
