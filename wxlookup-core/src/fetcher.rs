use crate::{
    Config,
    fetcher::openweather::OpenWeatherFetcher,
    model::{Coordinate, LocationQuery, OutcomeStatus, Source, Units, WeatherRequest},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Where weather requests are sent.
#[derive(Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Relay that injects the credential server-side and mirrors upstream status codes.
    Proxied { url: String },
    /// Upstream API called with `appid` in the query string.
    Direct { url: String, api_key: String },
}

impl Endpoint {
    pub fn url(&self) -> &str {
        match self {
            Endpoint::Proxied { url } | Endpoint::Direct { url, .. } => url,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Endpoint::Direct { .. })
    }
}

// Keeps the key out of `{:?}` output.
impl Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Proxied { url } => f.debug_struct("Proxied").field("url", url).finish(),
            Endpoint::Direct { url, .. } => f
                .debug_struct("Direct")
                .field("url", url)
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Performs exactly one upstream call per request and classifies the result.
///
/// Implementations never return errors: every failure becomes an
/// [`OutcomeStatus`] variant.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, request: &WeatherRequest) -> OutcomeStatus;

    async fn fetch_by_coordinate(
        &self,
        coord: Coordinate,
        units: Units,
        source: Source,
    ) -> OutcomeStatus {
        self.fetch(&WeatherRequest::by_coordinate(coord, units, source))
            .await
    }

    async fn fetch_by_query(&self, query: &LocationQuery, units: Units) -> OutcomeStatus {
        self.fetch(&WeatherRequest::by_query(query.clone(), units))
            .await
    }
}

/// Construct the weather fetcher described by the config.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherFetcher>> {
    let endpoint = config.endpoint()?;
    let fetcher = OpenWeatherFetcher::new(endpoint, config.request_timeout())?;
    Ok(Arc::new(fetcher))
}
