use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    error::FetcherBuildError,
    model::{OutcomeStatus, Target, WeatherRequest, WeatherResult},
};

use super::{Endpoint, WeatherFetcher};

/// Current-weather fetcher for OpenWeatherMap, direct or through a relay.
#[derive(Debug, Clone)]
pub struct OpenWeatherFetcher {
    endpoint: Endpoint,
    base: Url,
    http: Client,
}

impl OpenWeatherFetcher {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self, FetcherBuildError> {
        let base = Url::parse(endpoint.url()).map_err(|e| FetcherBuildError::InvalidUrl {
            url: endpoint.url().to_string(),
            reason: e.to_string(),
        })?;

        if endpoint.is_direct() {
            tracing::warn!(
                url = %base,
                "Direct mode sends the API key with every request; deploy a relay for production use"
            );
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            base,
            http,
        })
    }

    /// Full request URL, credential included.
    pub fn request_url(&self, request: &WeatherRequest) -> Url {
        self.build_url(request, false)
    }

    fn build_url(&self, request: &WeatherRequest, redact: bool) -> Url {
        let mut url = self.base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            match &request.target {
                Target::Coordinate(coord) => {
                    pairs.append_pair("lat", &coord.latitude().to_string());
                    pairs.append_pair("lon", &coord.longitude().to_string());
                }
                Target::Query(query) => {
                    pairs.append_pair("q", query.as_str());
                }
            }
            pairs.append_pair("units", request.units.as_str());
            if let Endpoint::Direct { api_key, .. } = &self.endpoint {
                pairs.append_pair("appid", if redact { "REDACTED" } else { api_key });
            }
        }
        url
    }
}

#[async_trait]
impl WeatherFetcher for OpenWeatherFetcher {
    async fn fetch(&self, request: &WeatherRequest) -> OutcomeStatus {
        let shown = self.build_url(request, true);
        tracing::debug!(url = %shown, source = %request.source, "Fetching weather");

        let res = match self.http.get(self.request_url(request)).send().await {
            Ok(res) => res,
            Err(e) => {
                let e = e.without_url();
                tracing::error!(url = %shown, error = %e, "Weather request failed");
                return OutcomeStatus::NetworkError(describe_transport_error(&e));
            }
        };

        let status = res.status();
        let body = match res.text().await {
            Ok(body) => body,
            Err(e) => {
                let e = e.without_url();
                tracing::error!(url = %shown, %status, error = %e, "Failed to read weather response body");
                return OutcomeStatus::NetworkError(describe_transport_error(&e));
            }
        };

        classify(request, status, &body)
    }
}

/// Map an HTTP status and body onto an outcome.
pub(crate) fn classify(request: &WeatherRequest, status: StatusCode, body: &str) -> OutcomeStatus {
    if status == StatusCode::UNAUTHORIZED {
        tracing::error!(%status, body = %truncate_body(body), "Weather API rejected the credential");
        return OutcomeStatus::Unauthorized;
    }

    if status == StatusCode::NOT_FOUND && matches!(request.target, Target::Query(_)) {
        tracing::info!(%status, "Weather API found no such location");
        return OutcomeStatus::NotFound;
    }

    if !status.is_success() {
        tracing::error!(%status, body = %truncate_body(body), "Weather API error");
        return OutcomeStatus::UpstreamError {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
        };
    }

    match serde_json::from_str::<OwCurrentResponse>(body) {
        Ok(parsed) => OutcomeStatus::Success(normalize(parsed, request)),
        Err(e) => {
            tracing::error!(error = %e, body = %truncate_body(body), "Failed to parse weather JSON");
            OutcomeStatus::NetworkError(format!("Malformed weather response: {e}"))
        }
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out".to_string()
    } else if e.is_connect() {
        "Could not connect to the weather service".to_string()
    } else {
        e.to_string()
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwCoord {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWeather {
    main: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    sys: Option<OwSys>,
    coord: Option<OwCoord>,
    weather: Option<Vec<OwWeather>>,
    main: Option<OwMain>,
    wind: Option<OwWind>,
    dt: Option<i64>,
}

fn normalize(raw: OwCurrentResponse, request: &WeatherRequest) -> WeatherResult {
    let location = location_label(&raw);
    let weather = raw
        .weather
        .and_then(|list| list.into_iter().next())
        .unwrap_or_default();
    let main = raw.main.unwrap_or_default();
    let wind = raw.wind.unwrap_or_default();

    WeatherResult {
        location,
        condition: non_empty(weather.main),
        description: non_empty(weather.description),
        temperature: main.temp,
        feels_like: main.feels_like,
        humidity: main.humidity,
        pressure: main.pressure,
        wind_speed: wind.speed,
        icon: non_empty(weather.icon),
        observed_at: raw.dt.and_then(unix_to_utc),
        units: request.units,
        source: request.source,
    }
}

/// `name, country`, then `name`, then the coordinates, then `Unknown`.
fn location_label(raw: &OwCurrentResponse) -> String {
    let name = raw.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let country = raw
        .sys
        .as_ref()
        .and_then(|s| s.country.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty());

    match (name, country, raw.coord.as_ref()) {
        (Some(name), Some(country), _) => format!("{name}, {country}"),
        (Some(name), None, _) => name.to_string(),
        (None, _, Some(OwCoord { lat: Some(lat), lon: Some(lon) })) => {
            format!("({lat:.2}, {lon:.2})")
        }
        _ => "Unknown".to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
