//! `route`: answer one path query through the background routing worker.

use std::sync::Arc;

use anyhow::{Context, Result};

use greenway_lib::worker::SmartInit;
use greenway_lib::{
    CacheStore, Coordinate, Fetcher, RoutingConfig, RoutingWorkerChannel, WorkerRequest,
};

use crate::output::{OutputFormat, RouteOutput};

/// Initialize the worker cache-first, then route `from` to `to`.
///
/// The fetcher moves onto the worker thread, so a blocking HTTP client is
/// never used or dropped on the async side.
pub async fn handle_route(
    config: &RoutingConfig,
    fetcher: Arc<dyn Fetcher>,
    from: Coordinate,
    to: Coordinate,
    format: OutputFormat,
) -> Result<()> {
    let cache = CacheStore::from_config(config);
    let mut worker = RoutingWorkerChannel::spawn(config.clone(), cache, fetcher)
        .context("failed to start routing worker")?;

    let outcome = query(&mut worker, config, from, to).await;
    worker.shutdown();
    let output = outcome?;

    format.render_route(&output)?;
    Ok(())
}

async fn query(
    worker: &mut RoutingWorkerChannel,
    config: &RoutingConfig,
    from: Coordinate,
    to: Coordinate,
) -> Result<RouteOutput> {
    let complete = worker
        .initialize(WorkerRequest::InitSmart(SmartInit {
            url: config.network_url.clone(),
        }))
        .await
        .with_context(|| format!("failed to load road network from {}", config.network_url))?;

    let route = worker
        .find_path(from, to, 1)
        .await
        .context("route query failed")?;

    Ok(RouteOutput {
        from_cache: complete.is_from_cache,
        route,
    })
}
