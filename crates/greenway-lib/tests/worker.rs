mod common;

use std::sync::Arc;

use tempfile::tempdir;

use greenway_lib::worker::{NetworkPayload, PathQuery, SmartInit};
use greenway_lib::{
    CacheStore, Coordinate, Error, NetworkOptimizer, RawFeatureCollection, RoutingConfig,
    RoutingWorkerChannel, WorkerRequest, WorkerResponse,
};

use common::{roads_fixture_bytes, CountingFetcher};

const URL: &str = "http://localhost:8081/roads.geojson";

fn config() -> RoutingConfig {
    RoutingConfig {
        min_segment_length_m: 10.0,
        ..RoutingConfig::default()
    }
}

fn raw_fixture() -> RawFeatureCollection {
    RawFeatureCollection::from_slice(&roads_fixture_bytes()).unwrap()
}

fn spawn(cache: CacheStore, fetcher: Arc<CountingFetcher>) -> RoutingWorkerChannel {
    RoutingWorkerChannel::spawn(config(), cache, fetcher).expect("worker starts")
}

#[tokio::test]
async fn find_path_before_init_reports_not_ready() {
    let mut worker = spawn(CacheStore::disabled(), Arc::new(CountingFetcher::failing()));

    let error = worker
        .find_path(Coordinate::new(30.78, 31.0), Coordinate::new(30.781, 31.001), 4)
        .await
        .unwrap_err();
    assert!(error.to_string().contains("not ready"), "{error}");
    worker.shutdown();
}

#[tokio::test]
async fn init_raw_returns_processed_network_and_answers_queries() {
    let mut worker = spawn(CacheStore::disabled(), Arc::new(CountingFetcher::failing()));

    let complete = worker
        .initialize(WorkerRequest::InitRaw(NetworkPayload {
            road_network: raw_fixture(),
        }))
        .await
        .unwrap();
    assert!(!complete.is_from_cache);
    assert_eq!(complete.road_network.as_ref().map(|n| n.len()), Some(3));
    assert_eq!(complete.nodes_cache.as_ref().map(Vec::len), Some(6));

    let route = worker
        .find_path(Coordinate::new(30.78, 31.0), Coordinate::new(30.781, 31.001), 1)
        .await
        .unwrap();
    assert_eq!(route.index, 1);
    assert_eq!(route.path.first(), Some(&[31.0, 30.78]));
    assert_eq!(route.path.last(), Some(&[31.001, 30.781]));
    assert_eq!(route.route_segments.len(), 2);
    worker.shutdown();
}

#[tokio::test]
async fn init_with_optimized_network_matches_init_raw() {
    let (network, _) = NetworkOptimizer::new(10.0, 5).optimize(&raw_fixture());

    let mut from_raw = spawn(CacheStore::disabled(), Arc::new(CountingFetcher::failing()));
    from_raw
        .initialize(WorkerRequest::InitRaw(NetworkPayload {
            road_network: raw_fixture(),
        }))
        .await
        .unwrap();

    let mut from_optimized = spawn(CacheStore::disabled(), Arc::new(CountingFetcher::failing()));
    let complete = from_optimized
        .initialize(WorkerRequest::Init(NetworkPayload {
            road_network: network.clone(),
        }))
        .await
        .unwrap();
    assert_eq!(complete.road_network, Some(network));

    let start = Coordinate::new(30.779, 31.001);
    let end = Coordinate::new(30.781, 31.002);
    let a = from_raw.find_path(start, end, 9).await.unwrap();
    let b = from_optimized.find_path(start, end, 9).await.unwrap();
    assert_eq!(a, b);

    from_raw.shutdown();
    from_optimized.shutdown();
}

#[tokio::test]
async fn init_from_cache_restores_without_fetching() {
    let mut builder = spawn(CacheStore::disabled(), Arc::new(CountingFetcher::failing()));
    let built = builder
        .initialize(WorkerRequest::InitRaw(NetworkPayload {
            road_network: raw_fixture(),
        }))
        .await
        .unwrap();
    builder.shutdown();

    let fetcher = Arc::new(CountingFetcher::failing());
    let mut worker = spawn(CacheStore::disabled(), fetcher.clone());
    let complete = worker
        .initialize(WorkerRequest::InitFromCache(greenway_lib::ProcessedNetwork {
            road_network: built.road_network.unwrap(),
            nodes_cache: built.nodes_cache.unwrap(),
        }))
        .await
        .unwrap();

    assert!(complete.is_from_cache);
    assert!(complete.road_network.is_none());
    assert_eq!(fetcher.call_count(), 0);

    let route = worker
        .find_path(Coordinate::new(30.78, 31.0), Coordinate::new(30.78, 31.002), 2)
        .await
        .unwrap();
    assert_eq!(route.path.len(), 3);
    worker.shutdown();
}

#[tokio::test]
async fn init_smart_fetches_once_then_uses_processed_cache() {
    let dir = tempdir().unwrap();

    let fetcher = Arc::new(CountingFetcher::new(roads_fixture_bytes()));
    let mut first = spawn(CacheStore::at(dir.path()), fetcher.clone());
    let complete = first
        .initialize(WorkerRequest::InitSmart(SmartInit {
            url: URL.to_string(),
        }))
        .await
        .unwrap();
    assert!(!complete.is_from_cache);
    assert_eq!(fetcher.call_count(), 1);
    first.shutdown();

    // Shutdown waits for the background cache write.
    assert!(CacheStore::at(dir.path()).processed.load().is_some());

    let cold = Arc::new(CountingFetcher::failing());
    let mut second = spawn(CacheStore::at(dir.path()), cold.clone());
    let complete = second
        .initialize(WorkerRequest::InitSmart(SmartInit {
            url: URL.to_string(),
        }))
        .await
        .unwrap();
    assert!(complete.is_from_cache);
    assert_eq!(cold.call_count(), 0);

    let route = second
        .find_path(Coordinate::new(30.78, 31.0), Coordinate::new(30.781, 31.001), 1)
        .await
        .unwrap();
    assert!(!route.path.is_empty());
    second.shutdown();
}

#[tokio::test]
async fn init_smart_failure_reports_error_and_stays_not_ready() {
    let mut worker = spawn(CacheStore::disabled(), Arc::new(CountingFetcher::failing()));

    let error = worker
        .initialize(WorkerRequest::InitSmart(SmartInit {
            url: URL.to_string(),
        }))
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Worker { .. }));

    let not_ready = worker
        .find_path(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0), 1)
        .await
        .unwrap_err();
    assert!(not_ready.to_string().contains("not ready"));
    worker.shutdown();
}

#[tokio::test]
async fn responses_arrive_in_submission_order_and_stale_ones_are_dropped() {
    let mut worker = spawn(CacheStore::disabled(), Arc::new(CountingFetcher::failing()));
    worker
        .initialize(WorkerRequest::InitRaw(NetworkPayload {
            road_network: raw_fixture(),
        }))
        .await
        .unwrap();

    for index in 1..=3 {
        worker
            .send(WorkerRequest::FindPath(PathQuery {
                start: Coordinate::new(30.78, 31.0),
                end: Coordinate::new(30.781, 31.002),
                index,
            }))
            .unwrap();
    }

    // Waiting for index 4 drains 1..=3 as stale.
    let latest = worker
        .find_path(Coordinate::new(30.78, 31.0), Coordinate::new(30.779, 31.001), 4)
        .await
        .unwrap();
    assert_eq!(latest.index, 4);

    worker
        .send(WorkerRequest::FindPath(PathQuery {
            start: Coordinate::new(30.78, 31.0),
            end: Coordinate::new(30.78, 31.002),
            index: 5,
        }))
        .unwrap();
    worker
        .send(WorkerRequest::FindPath(PathQuery {
            start: Coordinate::new(30.78, 31.0),
            end: Coordinate::new(30.78, 31.001),
            index: 6,
        }))
        .unwrap();
    let indices: Vec<u64> = [worker.recv().await, worker.recv().await]
        .into_iter()
        .map(|response| match response {
            Some(WorkerResponse::PathFound(route)) => route.index,
            other => panic!("unexpected response: {other:?}"),
        })
        .collect();
    assert_eq!(indices, vec![5, 6]);
    worker.shutdown();
}
