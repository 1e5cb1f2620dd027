use birdspot_core::{
    ClientConfig, Coordinates, ObservationProvider, ObservationQuery, ObservationSource,
};
use chrono::NaiveDate;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AROUND_POINT: &str = "/observations/around-point/";

fn utrecht() -> Coordinates {
    Coordinates::new(52.0907, 5.1214)
}

fn query(radius_km: f64) -> ObservationQuery {
    let day = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
    ObservationQuery::for_day(utrecht(), radius_km, day)
}

fn provider_for(server: &MockServer) -> ObservationProvider<birdspot_core::WaarnemingClient> {
    let config = ClientConfig {
        fetch_timeout: Duration::from_millis(300),
        probe_timeout: Duration::from_millis(300),
        ..ClientConfig::default()
    }
    .with_base_url(server.uri());
    ObservationProvider::live(config).unwrap()
}

fn record(id: u64, name: &str, lng: f64, lat: f64, rarity: u8) -> serde_json::Value {
    json!({
        "id": id,
        "species_detail": {"id": id + 1000, "name": name, "scientific_name": "Sp. test"},
        "point": {"type": "Point", "coordinates": [lng, lat]},
        "location_detail": {"name": format!("Plek {id}")},
        "date": "2024-04-20",
        "time": "09:15",
        "rarity": rarity,
        "user": 77
    })
}

fn names(observations: &[birdspot_core::Observation]) -> Vec<&str> {
    observations
        .iter()
        .map(|obs| obs.species.name.as_str())
        .collect()
}

#[tokio::test]
async fn live_fetch_sends_expected_query_and_sorts_by_distance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .and(query_param("lat", "52.0907"))
        .and(query_param("lng", "5.1214"))
        .and(query_param("radius", "5000"))
        .and(query_param("species_group", "1"))
        .and(query_param("days", "1"))
        .and(query_param("end_date", "2024-04-20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "results": [
                record(1, "Far", 5.16, 52.10, 1),
                record(2, "Near", 5.1215, 52.0908, 4),
                record(3, "Middle", 5.13, 52.09, 2)
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let observations = provider_for(&server).fetch(&query(5.0)).await;

    assert_eq!(names(&observations), vec!["Near", "Middle", "Far"]);
    assert_eq!(observations[0].rarity.name, "zeer zeldzaam");
    assert_eq!(observations[0].observer, "Waarnemer 77");
    assert_eq!(observations[0].observed_at.to_string(), "2024-04-20 09:15:00");
    let distances = observations
        .iter()
        .map(|obs| obs.distance_km.unwrap())
        .collect::<Vec<_>>();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn bare_array_body_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record(
            9, "Ijsvogel", 5.1214, 52.0907, 3
        )])))
        .mount(&server)
        .await;

    let observations = provider_for(&server).fetch(&query(2.0)).await;
    assert_eq!(names(&observations), vec!["Ijsvogel"]);
    assert_eq!(observations[0].id, 9);
}

#[tokio::test]
async fn equal_distances_keep_input_order() {
    let server = MockServer::start().await;
    let same_spot = |id: u64, name: &str| record(id, name, 5.13, 52.09, 1);
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            same_spot(1, "Eerste"),
            same_spot(2, "Tweede"),
            record(3, "Dichtbij", 5.1214, 52.0907, 1),
            same_spot(4, "Derde")
        ])))
        .mount(&server)
        .await;

    let observations = provider_for(&server).fetch(&query(5.0)).await;
    assert_eq!(names(&observations), vec!["Dichtbij", "Eerste", "Tweede", "Derde"]);
}

#[tokio::test]
async fn server_error_falls_back_to_full_mock_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let observations = provider_for(&server).fetch(&query(2.0)).await;
    assert_eq!(names(&observations), vec!["Merel", "Roodborst", "Koolmees"]);
    let distances = observations
        .iter()
        .map(|obs| obs.distance_km.unwrap())
        .collect::<Vec<_>>();
    assert_eq!(distances, vec![0.8, 1.2, 1.5]);
    assert!((observations[0].location.lat - (52.0907 + 0.005)).abs() < 1e-9);
}

#[tokio::test]
async fn mock_fallback_is_filtered_to_radius() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let observations = provider_for(&server).fetch(&query(1.0)).await;
    assert_eq!(names(&observations), vec!["Merel"]);
}

#[tokio::test]
async fn malformed_body_falls_back_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let observations = provider_for(&server).fetch(&query(20.0)).await;
    assert_eq!(observations.len(), 3);
    assert_eq!(observations[0].species.id, 101);
}

#[tokio::test]
async fn non_json_body_falls_back_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let observations = provider_for(&server).fetch(&query(2.0)).await;
    assert_eq!(names(&observations), vec!["Merel", "Roodborst", "Koolmees"]);
}

#[tokio::test]
async fn slow_response_times_out_into_mock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([record(5, "Te laat", 5.12, 52.09, 4)]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    assert_eq!(provider.source().config().fetch_timeout, Duration::from_millis(300));

    let err = provider.source().fetch_observations(&query(2.0)).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.code(), "timeout");

    let observations = provider.fetch(&query(2.0)).await;
    assert_eq!(names(&observations), vec!["Merel", "Roodborst", "Koolmees"]);
}

#[tokio::test]
async fn unreachable_host_falls_back_to_mock() {
    let config = ClientConfig {
        fetch_timeout: Duration::from_millis(300),
        ..ClientConfig::default()
    }
    .with_base_url("http://127.0.0.1:9");
    let provider = ObservationProvider::live(config).unwrap();

    let observations = provider.fetch(&query(1.0)).await;
    assert_eq!(names(&observations), vec!["Merel"]);
}

#[tokio::test]
async fn test_connection_reports_probe_status() {
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .and(query_param("lat", "52.0726"))
        .and(query_param("lng", "5.0966"))
        .and(query_param("radius", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&healthy)
        .await;
    assert!(provider_for(&healthy).test_connection().await);

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AROUND_POINT))
        .respond_with(ResponseTemplate::new(502))
        .mount(&failing)
        .await;
    assert!(!provider_for(&failing).test_connection().await);
}
