use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, info, warn};

use crate::cache::RawAssetCache;
use crate::error::{Error, Result};
use crate::network::RawFeatureCollection;

/// Environment override pointing at a local GeoJSON file used instead of HTTP.
pub const NETWORK_SOURCE_ENV: &str = "GREENWAY_NETWORK_SOURCE";

/// Bytes returned by a [`Fetcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Byte-fetch capability.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedAsset>;
}

/// Blocking HTTP fetcher honouring [`NETWORK_SOURCE_ENV`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    source_override: Option<PathBuf>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            source_override: env::var_os(NETWORK_SOURCE_ENV).map(PathBuf::from),
        })
    }

    /// Read every request from `path` instead of the network.
    pub fn with_source_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_override = Some(path.into());
        self
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedAsset> {
        if let Some(path) = &self.source_override {
            info!(%url, source = %path.display(), "using local road network override");
            let bytes = fs::read(path).map_err(|err| Error::FetchFailed {
                url: url.to_string(),
                message: format!("{}: {err}", path.display()),
            })?;
            return Ok(FetchedAsset {
                bytes,
                content_type: None,
            });
        }

        info!(%url, "downloading road network");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/geo+json, application/json")
            .send()
            .map_err(|err| fetch_failed(url, err))?;

        let response = response
            .error_for_status()
            .map_err(|err| fetch_failed(url, err))?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().map_err(|err| fetch_failed(url, err))?;

        debug!(%url, bytes = bytes.len(), "download complete");
        Ok(FetchedAsset {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Load the raw network for `url`, preferring the raw cache.
///
/// Only payloads that parse as a feature collection are stored. A cached entry
/// that no longer parses is evicted and fetched again. The cache write never
/// fails the fetch.
pub fn fetch_network(
    fetcher: &dyn Fetcher,
    cache: &RawAssetCache,
    url: &str,
) -> Result<RawFeatureCollection> {
    if let Some(bytes) = cache.get(url) {
        match RawFeatureCollection::from_slice(&bytes) {
            Ok(collection) => return Ok(collection),
            Err(error) => {
                warn!(%error, %url, "cached raw network is unusable; evicting it");
                cache.remove(url);
            }
        }
    }

    let asset = fetcher.fetch(url)?;
    let collection = RawFeatureCollection::from_slice(&asset.bytes)?;
    cache.put(url, &asset.bytes, asset.content_type.as_deref());
    Ok(collection)
}

fn fetch_failed(url: &str, err: reqwest::Error) -> Error {
    Error::FetchFailed {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .user_agent(user_agent())
        .build()
        .map_err(Error::Http)
}

fn user_agent() -> String {
    format!("greenway-lib/{version}", version = env!("CARGO_PKG_VERSION"))
}
