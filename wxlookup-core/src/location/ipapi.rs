use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{error::IpLookupError, model::Coordinate};

use super::IpGeolocator;

/// IP geolocation through an ipapi.co-compatible JSON endpoint.
#[derive(Debug, Clone)]
pub struct IpApiLocator {
    url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    city: Option<String>,
}

impl IpApiLocator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, IpLookupError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[async_trait]
impl IpGeolocator for IpApiLocator {
    async fn locate(&self) -> Result<Coordinate, IpLookupError> {
        tracing::debug!(url = %self.url, "Requesting IP geolocation");

        let res = self.http.get(&self.url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(IpLookupError::Status(status.as_u16()));
        }

        let body = res.text().await?;
        let parsed: IpApiResponse =
            serde_json::from_str(&body).map_err(|e| IpLookupError::Malformed(e.to_string()))?;

        let (Some(lat), Some(lon)) = (parsed.latitude, parsed.longitude) else {
            return Err(IpLookupError::Malformed(
                "missing latitude or longitude".to_string(),
            ));
        };

        let coord = Coordinate::new(lat, lon)?;
        tracing::info!(lat, lon, city = ?parsed.city, "IP geolocation resolved");
        Ok(coord)
    }
}
