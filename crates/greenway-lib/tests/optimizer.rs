mod common;

use greenway_lib::geo::polyline_length;
use greenway_lib::{Coordinate, GraphIndex, NetworkOptimizer, RawFeatureCollection};
use serde_json::json;

use common::roads_fixture_bytes;

fn single_line(coordinates: serde_json::Value) -> RawFeatureCollection {
    serde_json::from_value(json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"name": "test"},
            "geometry": {"type": "LineString", "coordinates": coordinates}
        }]
    }))
    .expect("valid collection")
}

#[test]
fn zero_threshold_keeps_three_node_line() {
    let raw = single_line(json!([[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]));
    let (network, report) = NetworkOptimizer::new(0.0, 5).optimize(&raw);

    assert_eq!(report.kept, 1);
    assert_eq!(
        network.features[0].coordinates,
        vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 1.0),
            Coordinate::new(0.0, 2.0)
        ]
    );
}

#[test]
fn short_feature_is_dropped_and_contributes_nothing() {
    // About 5.6 m of latitude.
    let raw = single_line(json!([[31.0, 30.0], [31.0, 30.00005]]));
    let feature_length = polyline_length(&[
        Coordinate::new(30.0, 31.0),
        Coordinate::new(30.00005, 31.0),
    ]);
    assert!(feature_length > 5.0 && feature_length < 10.0);

    let (network, report) = NetworkOptimizer::new(10.0, 5).optimize(&raw);
    assert!(network.is_empty());
    assert_eq!(report.dropped_short, 1);

    let graph = GraphIndex::build(&network, 5);
    assert_eq!(graph.node_count(), 0);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn threshold_partitions_features_by_length() {
    let raw = RawFeatureCollection::from_slice(&roads_fixture_bytes()).expect("fixture parses");

    for threshold in [0.0, 1.0, 10.0, 150.0, 250.0, 1_000.0] {
        let (network, report) = NetworkOptimizer::new(threshold, 5).optimize(&raw);
        let expected = raw
            .features
            .iter()
            .filter(|feature| {
                feature
                    .geometry
                    .as_ref()
                    .is_some_and(|geometry| geometry.kind == "LineString")
            })
            .count();

        assert_eq!(report.kept + report.dropped_short, expected);
        assert!(network.len() <= raw.features.len());
        for feature in &network.features {
            assert!(polyline_length(&feature.coordinates) >= threshold - 1.0);
        }
    }
}

#[test]
fn fixture_drops_driveway_and_point() {
    let raw = RawFeatureCollection::from_slice(&roads_fixture_bytes()).expect("fixture parses");
    let (network, report) = NetworkOptimizer::new(10.0, 5).optimize(&raw);

    assert_eq!(report.input_features, 5);
    assert_eq!(report.kept, 3);
    assert_eq!(report.dropped_short, 1);
    assert_eq!(report.dropped_invalid, 1);

    let serialized = serde_json::to_value(&network).expect("serializes");
    for feature in serialized["features"].as_array().expect("features array") {
        assert_eq!(feature["properties"], json!({}));
    }
}

#[test]
fn optimization_is_deterministic() {
    let raw = RawFeatureCollection::from_slice(&roads_fixture_bytes()).expect("fixture parses");
    let optimizer = NetworkOptimizer::new(10.0, 5);
    assert_eq!(optimizer.optimize(&raw), optimizer.optimize(&raw));
}
