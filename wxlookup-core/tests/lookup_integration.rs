//! End-to-end lookup flow against mock IP-geolocation and weather services.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxlookup_core::{
    Config, IpGeolocator, IpLookupError, LocationFailure, OutcomeStatus, Phase, Settled, Units,
    WeatherLookup,
    location::{IpApiLocator, Unsupported},
    presenter::MSG_LOCATION_UNAVAILABLE,
};

fn config_for(server: &MockServer) -> Config {
    Config {
        proxy_url: format!("{}/weather", server.uri()),
        ip_lookup_url: format!("{}/json/", server.uri()),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

async fn mount_ip(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ip_locator_parses_coordinates() {
    let mock_server = MockServer::start().await;
    mount_ip(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "203.0.113.7",
            "city": "Amsterdam",
            "latitude": 52.37,
            "longitude": 4.89
        })),
    )
    .await;

    let locator =
        IpApiLocator::new(format!("{}/json/", mock_server.uri()), Duration::from_secs(5)).unwrap();
    let coord = locator.locate().await.unwrap();

    assert_eq!(coord.latitude(), 52.37);
    assert_eq!(coord.longitude(), 4.89);
}

#[tokio::test]
async fn test_ip_locator_rejects_bad_responses() {
    let mock_server = MockServer::start().await;
    let locator =
        IpApiLocator::new(format!("{}/json/", mock_server.uri()), Duration::from_secs(5)).unwrap();

    mount_ip(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "error": true, "reason": "RateLimited" })),
    )
    .await;
    assert!(matches!(locator.locate().await, Err(IpLookupError::Malformed(_))));

    mock_server.reset().await;
    mount_ip(&mock_server, ResponseTemplate::new(429)).await;
    assert!(matches!(locator.locate().await, Err(IpLookupError::Status(429))));

    mock_server.reset().await;
    mount_ip(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "latitude": 123.0, "longitude": 4.0 })),
    )
    .await;
    assert!(matches!(locator.locate().await, Err(IpLookupError::Invalid(_))));
}

#[tokio::test]
async fn test_automatic_lookup_falls_back_to_ip() {
    let mock_server = MockServer::start().await;
    mount_ip(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "latitude": 51.5, "longitude": -0.12 })),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "51.5"))
        .and(query_param("lon", "-0.12"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "London",
            "sys": { "country": "GB" },
            "weather": [{ "main": "Rain", "description": "light rain", "icon": "10d" }],
            "main": { "temp": 15.4, "feels_like": 15.0, "humidity": 90, "pressure": 1008 },
            "wind": { "speed": 6.2 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let lookup = WeatherLookup::from_config(&config_for(&mock_server), Arc::new(Unsupported)).unwrap();
    let report = lookup
        .locate_and_fetch(Units::Metric)
        .await
        .into_report()
        .expect("only action is the latest");

    assert_eq!(report.location_failure, Some(LocationFailure::PermissionUnsupported));
    let panel = report.display.result.expect("result panel shown");
    assert_eq!(panel.location, "London, GB — ip");
    assert_eq!(panel.summary, "Rain — 15°C (light rain)");
    assert_eq!(lookup.phase(), Phase::Displaying);
}

#[tokio::test]
async fn test_automatic_lookup_stops_when_ip_fails() {
    let mock_server = MockServer::start().await;
    mount_ip(&mock_server, ResponseTemplate::new(500)).await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let lookup = WeatherLookup::from_config(&config_for(&mock_server), Arc::new(Unsupported)).unwrap();
    let settled = lookup.locate_and_fetch(Units::Metric).await;

    let Settled::Latest(report) = settled else {
        panic!("expected latest");
    };
    assert_eq!(report.outcome, Some(OutcomeStatus::LocationUnavailable));
    assert!(report.display.prompt_manual_input);
    assert_eq!(report.display.message.unwrap().text, MSG_LOCATION_UNAVAILABLE);
}

#[tokio::test]
async fn test_manual_lookup_then_unit_change() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Oslo"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Oslo", "sys": { "country": "NO" }, "main": { "temp": -3.4 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Oslo"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Oslo", "sys": { "country": "NO" }, "main": { "temp": 25.9 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let lookup = WeatherLookup::from_config(&config_for(&mock_server), Arc::new(Unsupported)).unwrap();

    let metric = lookup.fetch_manual(" Oslo ", Units::Metric).await.into_report().unwrap();
    assert_eq!(metric.display.result.unwrap().temperature, "-3°C");

    let imperial = lookup
        .change_units(Units::Imperial)
        .await
        .and_then(Settled::into_report)
        .unwrap();
    let panel = imperial.display.result.unwrap();
    assert_eq!(panel.temperature, "26°F");
    assert_eq!(panel.humidity, "N/A");
}
