use super::*;

fn bbox() -> BoundingBox {
    BoundingBox {
        south: -37.8,
        west: 144.9,
        north: -37.7,
        east: 145.0,
    }
}

#[test]
fn search_url_encodes_place_and_fixes_format() {
    let client = GeoClient::with_base_urls(
        "https://geo.example.com/nominatim",
        "https://overpass.example.com/api/interpreter",
        "courtdb-test",
        5,
    )
    .expect("client builds");
    let url = client.search_url("Fitzroy, Victoria");
    assert_eq!(
        url.as_str(),
        "https://geo.example.com/nominatim/search?q=Fitzroy%2C+Victoria&format=json&limit=1"
    );
}

#[test]
fn search_url_from_root_base() {
    let client = GeoClient::with_base_urls(
        "https://geo.example.com/",
        "https://overpass.example.com/",
        "courtdb-test",
        5,
    )
    .expect("client builds");
    assert!(client
        .search_url("Carlton")
        .as_str()
        .starts_with("https://geo.example.com/search?q=Carlton"));
}

#[test]
fn query_selects_sport_and_leisure_with_center_output() {
    let query = build_overpass_query(&bbox(), "tennis|padel");
    assert!(query.starts_with("[out:json][timeout:60];"));
    assert!(query.contains("nwr[\"sport\"~\"tennis|padel\",i](-37.8,144.9,-37.7,145);"));
    assert!(query.contains(
        "nwr[\"leisure\"~\"^(sports_centre|pitch|sports_hall|fitness_centre)$\"][\"sport\"](-37.8,144.9,-37.7,145);"
    ));
    assert!(query.trim_end().ends_with("out center tags;"));
}

#[test]
fn query_escapes_quotes_in_pattern() {
    let query = build_overpass_query(&bbox(), "ten\"nis");
    assert!(query.contains("ten\\\"nis"));
}

#[test]
fn invalid_overpass_url_is_rejected() {
    let result = GeoClient::with_base_urls("https://geo.example.com", "not a url", "ua", 5);
    assert!(matches!(result, Err(GeoError::InvalidResponse(_))));
}
