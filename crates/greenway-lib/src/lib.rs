//! Greenway routing library entry points.
//!
//! This crate turns raw GeoJSON road geometry into a queryable graph, answers
//! shortest-path queries on a background worker, persists the processed graph
//! across sessions, and resolves found paths into stable segment identifiers.
//! Higher-level consumers (the CLI, UI layers) should only depend on the items
//! exported here instead of reimplementing behavior.
//!

#![deny(warnings)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod graph;
pub mod network;
pub mod path;
pub mod repository;
pub mod segment;
pub mod snap;
pub mod worker;

pub use cache::{CacheEnvelope, CacheStore, ProcessedCache, ProcessedNetwork, RawAssetCache};
pub use config::RoutingConfig;
pub use engine::{RouteResult, RoutingEngine, SearchAlgorithm};
pub use error::{Error, Result};
pub use fetch::{Fetcher, FetchedAsset, HttpFetcher};
pub use geo::{Coordinate, NodeKey};
pub use graph::{Edge, GraphIndex, Node, NodeId};
pub use network::{NetworkOptimizer, OptimizationReport, OptimizedNetwork, RawFeatureCollection};
pub use path::{find_path_a_star, find_path_dijkstra, PathResult};
pub use repository::RoadNetworkRepository;
pub use segment::{EdgeSegmentResolver, SegmentId};
pub use snap::NodeSnapper;
pub use worker::{RoutingWorkerChannel, WorkerRequest, WorkerResponse, WorkerState};
