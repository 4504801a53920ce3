//! Background routing worker and its message protocol.
//!
//! The worker owns the [`RoutingEngine`] for its whole lifetime on a dedicated
//! thread. Callers only hold a [`RoutingWorkerChannel`] and exchange
//! [`WorkerRequest`] / [`WorkerResponse`] messages with it.
//!
//! Requests are processed strictly one at a time, in submission order. An
//! in-flight search cannot be cancelled or pre-empted, and there is no
//! timeout: a long search delays every request queued behind it. Callers tag
//! each path query with an index and ignore responses for indices they no
//! longer care about.
//!
//! | Request                                 | Response                                     |
//! |-----------------------------------------|----------------------------------------------|
//! | `init-smart {url}`                      | `init-complete {isFromCache}` or `error`     |
//! | `init {roadNetwork}` (optimized)        | `init-complete {roadNetwork, nodesCache}`    |
//! | `init-raw {roadNetwork}` (raw)          | `init-complete {roadNetwork, nodesCache}`    |
//! | `init-from-cache {roadNetwork, nodesCache}` | `init-complete {isFromCache: true}`      |
//! | `findPath {start, end, index}`          | `path-found {...}` or `error`                |

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, ProcessedNetwork};
use crate::config::RoutingConfig;
use crate::engine::{RouteResult, RoutingEngine};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::geo::Coordinate;
use crate::network::{OptimizedNetwork, RawFeatureCollection};
use crate::repository::fetch_optimized;

/// Network payload supplied with `init` / `init-raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPayload<T> {
    pub road_network: T,
}

/// Source URL for `init-smart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartInit {
    pub url: String,
}

/// Path query with caller-assigned correlation index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathQuery {
    pub start: Coordinate,
    pub end: Coordinate,
    pub index: u64,
}

/// Messages accepted by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WorkerRequest {
    /// Check the processed cache, otherwise fetch, optimize, build, and persist.
    #[serde(rename = "init-smart")]
    InitSmart(SmartInit),
    /// Build from an already optimized network.
    #[serde(rename = "init")]
    Init(NetworkPayload<OptimizedNetwork>),
    /// Optimize a raw feature collection, then build.
    #[serde(rename = "init-raw")]
    InitRaw(NetworkPayload<RawFeatureCollection>),
    /// Restore from a processed cache entry.
    #[serde(rename = "init-from-cache")]
    InitFromCache(ProcessedNetwork),
    #[serde(rename = "findPath")]
    FindPath(PathQuery),
}

/// Payload of `init-complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitComplete {
    #[serde(default)]
    pub is_from_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_network: Option<OptimizedNetwork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes_cache: Option<Vec<[f64; 2]>>,
}

impl InitComplete {
    fn from_cache() -> Self {
        Self {
            is_from_cache: true,
            road_network: None,
            nodes_cache: None,
        }
    }

    fn built(processed: ProcessedNetwork) -> Self {
        Self {
            is_from_cache: false,
            road_network: Some(processed.road_network),
            nodes_cache: Some(processed.nodes_cache),
        }
    }
}

/// Payload of `error`. `index` is set when the failure belongs to a path query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
}

/// Messages emitted by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WorkerResponse {
    #[serde(rename = "init-complete")]
    InitComplete(InitComplete),
    #[serde(rename = "path-found")]
    PathFound(RouteResult),
    #[serde(rename = "error")]
    Error(WorkerError),
}

impl WorkerResponse {
    fn error(error: &Error, index: Option<u64>) -> Self {
        WorkerResponse::Error(WorkerError {
            message: error.to_string(),
            index,
        })
    }
}

/// State owned by the worker loop. Handlers take it explicitly, so it can be
/// driven directly in tests without a thread.
pub struct WorkerState {
    config: RoutingConfig,
    cache: CacheStore,
    fetcher: Arc<dyn Fetcher>,
    engine: Option<RoutingEngine>,
    writers: Vec<JoinHandle<()>>,
}

impl WorkerState {
    pub fn new(config: RoutingConfig, cache: CacheStore, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            cache,
            fetcher,
            engine: None,
            writers: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&RoutingEngine> {
        self.engine.as_ref()
    }

    /// Process one request to completion.
    pub fn handle(&mut self, request: WorkerRequest) -> WorkerResponse {
        match request {
            WorkerRequest::InitSmart(SmartInit { url }) => match self.init_smart(&url) {
                Ok(complete) => WorkerResponse::InitComplete(complete),
                Err(error) => {
                    warn!(%error, %url, "routing engine initialization failed");
                    WorkerResponse::error(&error, None)
                }
            },
            WorkerRequest::Init(NetworkPayload { road_network }) => {
                let engine = RoutingEngine::from_optimized(road_network, &self.config);
                WorkerResponse::InitComplete(self.install(engine))
            }
            WorkerRequest::InitRaw(NetworkPayload { road_network }) => {
                let (engine, _) = RoutingEngine::from_raw(&road_network, &self.config);
                WorkerResponse::InitComplete(self.install(engine))
            }
            WorkerRequest::InitFromCache(processed) => {
                self.engine = Some(RoutingEngine::from_processed(processed, &self.config));
                info!("routing engine restored from processed cache");
                WorkerResponse::InitComplete(InitComplete::from_cache())
            }
            WorkerRequest::FindPath(query) => {
                let Some(engine) = &self.engine else {
                    return WorkerResponse::error(&Error::EngineNotReady, Some(query.index));
                };
                match engine.find_path(query.start, query.end, query.index) {
                    Ok(result) => WorkerResponse::PathFound(result),
                    Err(error) => WorkerResponse::error(&error, Some(query.index)),
                }
            }
        }
    }

    fn install(&mut self, engine: RoutingEngine) -> InitComplete {
        let processed = engine.processed();
        info!(
            nodes = engine.graph().node_count(),
            edges = engine.graph().edge_count(),
            "routing engine ready"
        );
        self.engine = Some(engine);
        InitComplete::built(processed)
    }

    fn init_smart(&mut self, url: &str) -> Result<InitComplete> {
        if let Some(processed) = self.cache.processed.load() {
            self.engine = Some(RoutingEngine::from_processed(processed, &self.config));
            return Ok(InitComplete::from_cache());
        }

        let network = fetch_optimized(self.fetcher.as_ref(), &self.cache.raw, url, &self.config)?;
        let engine = RoutingEngine::from_optimized(network, &self.config);
        self.writers.retain(|writer| !writer.is_finished());
        if let Some(writer) = persist_in_background(self.cache.clone(), engine.processed()) {
            self.writers.push(writer);
        }
        self.install(engine);

        Ok(InitComplete {
            is_from_cache: false,
            road_network: None,
            nodes_cache: None,
        })
    }

    /// Wait for outstanding cache writes started by `init-smart`.
    pub fn finish(self) {
        for writer in self.writers {
            if writer.join().is_err() {
                warn!("processed cache writer panicked");
            }
        }
    }
}

fn persist_in_background(cache: CacheStore, processed: ProcessedNetwork) -> Option<JoinHandle<()>> {
    let spawned = thread::Builder::new()
        .name("greenway-cache-writer".to_string())
        .spawn(move || {
            cache.processed.save(&processed);
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(error) => {
            warn!(%error, "could not start processed cache writer");
            None
        }
    }
}

/// Caller-side end of the worker channel.
pub struct RoutingWorkerChannel {
    requests: Option<UnboundedSender<WorkerRequest>>,
    responses: UnboundedReceiver<WorkerResponse>,
    thread: Option<JoinHandle<()>>,
}

impl RoutingWorkerChannel {
    /// Start a worker thread owning a fresh [`WorkerState`].
    pub fn spawn(config: RoutingConfig, cache: CacheStore, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<WorkerRequest>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<WorkerResponse>();
        let mut state = WorkerState::new(config, cache, fetcher);

        let thread = thread::Builder::new()
            .name("greenway-routing".to_string())
            .spawn(move || {
                while let Some(request) = request_rx.blocking_recv() {
                    let response = state.handle(request);
                    if response_tx.send(response).is_err() {
                        break;
                    }
                }
                state.finish();
                debug!("routing worker stopped");
            })?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            thread: Some(thread),
        })
    }

    /// Queue a request without waiting.
    pub fn send(&self, request: WorkerRequest) -> Result<()> {
        self.requests
            .as_ref()
            .ok_or(Error::WorkerClosed)?
            .send(request)
            .map_err(|_| Error::WorkerClosed)
    }

    /// Next response, or `None` once the worker has stopped.
    pub async fn recv(&mut self) -> Option<WorkerResponse> {
        self.responses.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv) for callers outside an async runtime.
    pub fn recv_blocking(&mut self) -> Option<WorkerResponse> {
        self.responses.blocking_recv()
    }

    /// Send an initialization request and wait for its outcome.
    pub async fn initialize(&mut self, request: WorkerRequest) -> Result<InitComplete> {
        self.send(request)?;
        loop {
            match self.recv().await.ok_or(Error::WorkerClosed)? {
                WorkerResponse::InitComplete(complete) => return Ok(complete),
                WorkerResponse::Error(error) if error.index.is_none() => {
                    return Err(Error::Worker {
                        message: error.message,
                    })
                }
                other => debug!(?other, "discarding response while awaiting init"),
            }
        }
    }

    /// Submit a path query and wait for the response carrying the same index.
    /// Responses for other indices are stale and dropped.
    pub async fn find_path(&mut self, start: Coordinate, end: Coordinate, index: u64) -> Result<RouteResult> {
        self.send(WorkerRequest::FindPath(PathQuery { start, end, index }))?;
        loop {
            match self.recv().await.ok_or(Error::WorkerClosed)? {
                WorkerResponse::PathFound(result) if result.index == index => return Ok(result),
                WorkerResponse::Error(error) if error.index == Some(index) => {
                    return Err(Error::Worker {
                        message: error.message,
                    })
                }
                other => debug!(?other, "discarding stale worker response"),
            }
        }
    }

    /// Close the request side and wait for the worker to finish its current job
    /// and any pending cache writes.
    pub fn shutdown(mut self) {
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("routing worker panicked");
            }
        }
    }
}
