//! `cache info` and `cache clear`.

use anyhow::Result;
use tracing::info;

use greenway_lib::cache::PROCESSED_SCHEMA_VERSION;
use greenway_lib::{CacheStore, RoutingConfig};

use crate::output::{CacheInfoOutput, OutputFormat};

pub fn handle_cache_info(config: &RoutingConfig, format: OutputFormat) -> Result<()> {
    let cache = CacheStore::from_config(config);
    format.render_cache_info(&CacheInfoOutput {
        cache_dir: config
            .cache_dir
            .as_ref()
            .map(|dir| dir.display().to_string()),
        schema_version: PROCESSED_SCHEMA_VERSION.to_string(),
        processed: cache.processed.info(),
    })?;
    Ok(())
}

pub fn handle_cache_clear(config: &RoutingConfig) -> Result<()> {
    CacheStore::from_config(config).clear();
    info!("road network cache cleared");
    println!("Cache cleared");
    Ok(())
}
