//! Integration tests for `GeoClient` using wiremock HTTP mocks.

use courtdb_geo::{GeoClient, GeoError};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> GeoClient {
    GeoClient::with_base_urls(
        &server.uri(),
        &format!("{}/api/interpreter", server.uri()),
        "courtdb-test",
        5,
    )
    .expect("client construction should not fail")
}

#[tokio::test]
async fn resolve_bounds_returns_first_result_box() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Fitzroy, Victoria, Australia"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "display_name": "Fitzroy, City of Yarra, Victoria, Australia",
                "boundingbox": ["-37.8105", "-37.7951", "144.9741", "144.9880"]
            }
        ])))
        .mount(&server)
        .await;

    let bbox = test_client(&server)
        .resolve_bounds("Fitzroy, Victoria, Australia")
        .await
        .expect("should resolve bounds");

    assert!((bbox.south + 37.8105).abs() < 1e-9);
    assert!((bbox.north + 37.7951).abs() < 1e-9);
    assert!((bbox.west - 144.9741).abs() < 1e-9);
    assert!((bbox.east - 144.9880).abs() < 1e-9);
}

#[tokio::test]
async fn resolve_bounds_empty_result_is_place_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .resolve_bounds("Atlantis")
        .await
        .expect_err("no results should fail");

    assert!(matches!(err, GeoError::PlaceNotFound(ref p) if p == "Atlantis"));
}

#[tokio::test]
async fn resolve_bounds_server_error_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .resolve_bounds("Fitzroy")
        .await
        .expect_err("503 should fail");

    assert!(matches!(err, GeoError::Http(_)));
}

#[tokio::test]
async fn query_elements_maps_nodes_and_ways() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .and(body_string_contains("data="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "version": 0.6,
            "elements": [
                {
                    "type": "node",
                    "id": 1,
                    "lat": -37.80,
                    "lon": 144.98,
                    "tags": { "name": "Fitzroy Tennis Club", "sport": "tennis" }
                },
                {
                    "type": "way",
                    "id": 2,
                    "center": { "lat": -37.79, "lon": 144.97 },
                    "tags": { "name": "Edinburgh Gardens Courts", "leisure": "pitch", "sport": "basketball" }
                },
                {
                    "type": "way",
                    "id": 3,
                    "center": { "lat": -37.78, "lon": 144.96 },
                    "tags": { "leisure": "pitch", "sport": "soccer" }
                },
                {
                    "type": "relation",
                    "id": 4,
                    "tags": { "name": "No Centre Sports Centre", "sport": "multi" }
                }
            ]
        })))
        .mount(&server)
        .await;

    let bbox = courtdb_geo::BoundingBox {
        south: -37.81,
        west: 144.95,
        north: -37.77,
        east: 144.99,
    };
    let candidates = test_client(&server)
        .query_elements(&bbox, "tennis|basketball")
        .await
        .expect("should parse elements");

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].name, "Fitzroy Tennis Club");
    assert_eq!(candidates[0].place_id.as_deref(), Some("osm:node/1"));
    assert!((candidates[1].latitude + 37.79).abs() < 1e-9);
    assert_eq!(candidates[1].place_id.as_deref(), Some("osm:way/2"));
}

#[tokio::test]
async fn query_elements_rejects_non_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;

    let bbox = courtdb_geo::BoundingBox {
        south: 0.0,
        west: 0.0,
        north: 1.0,
        east: 1.0,
    };
    let err = test_client(&server)
        .query_elements(&bbox, "tennis")
        .await
        .expect_err("html should not parse");

    assert!(matches!(err, GeoError::Deserialize { .. }));
}
