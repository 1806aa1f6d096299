use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::Longitude(longitude));
        }

        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Free-text city name or postal code. Never empty, always trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationQuery(String);

impl LocationQuery {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn temperature_glyph(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn wind_speed_unit(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial."
            )),
        }
    }
}

/// Where the location of a request came from. Display and logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Device,
    Ip,
    Manual,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Device => "device",
            Source::Ip => "ip",
            Source::Manual => "manual",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one way of addressing the upstream: coordinates or a text query.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Coordinate(Coordinate),
    Query(LocationQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub target: Target,
    pub units: Units,
    pub source: Source,
}

impl WeatherRequest {
    pub fn by_coordinate(coord: Coordinate, units: Units, source: Source) -> Self {
        Self {
            target: Target::Coordinate(coord),
            units,
            source,
        }
    }

    pub fn by_query(query: LocationQuery, units: Units) -> Self {
        Self {
            target: Target::Query(query),
            units,
            source: Source::Manual,
        }
    }

    /// Same request, different unit system.
    pub fn with_units(&self, units: Units) -> Self {
        Self {
            units,
            ..self.clone()
        }
    }
}

/// Normalized current conditions. Numeric fields are `None` when upstream omitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub location: String,
    pub condition: Option<String>,
    pub description: Option<String>,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub icon: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,
    pub units: Units,
    pub source: Source,
}

/// Terminal value of one lookup attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeStatus {
    Success(WeatherResult),
    NotFound,
    Unauthorized,
    UpstreamError { code: u16, message: String },
    NetworkError(String),
    PermissionDenied,
    LocationUnavailable,
}

impl OutcomeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Success(_))
    }

    /// Automatic location failed; the user has to type a city or postal code.
    pub fn needs_manual_input(&self) -> bool {
        matches!(
            self,
            OutcomeStatus::PermissionDenied | OutcomeStatus::LocationUnavailable
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutcomeStatus::Success(_) => "success",
            OutcomeStatus::NotFound => "not_found",
            OutcomeStatus::Unauthorized => "unauthorized",
            OutcomeStatus::UpstreamError { .. } => "upstream_error",
            OutcomeStatus::NetworkError(_) => "network_error",
            OutcomeStatus::PermissionDenied => "permission_denied",
            OutcomeStatus::LocationUnavailable => "location_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_accepts_bounds() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_nan() {
        assert_eq!(
            Coordinate::new(91.0, 0.0).unwrap_err(),
            ValidationError::Latitude(91.0)
        );
        assert_eq!(
            Coordinate::new(0.0, -180.5).unwrap_err(),
            ValidationError::Longitude(-180.5)
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn query_is_trimmed() {
        let q = LocationQuery::parse("  Paris \n").expect("valid query");
        assert_eq!(q.as_str(), "Paris");
    }

    #[test]
    fn blank_query_is_rejected() {
        assert_eq!(LocationQuery::parse("").unwrap_err(), ValidationError::EmptyQuery);
        assert_eq!(LocationQuery::parse(" \t ").unwrap_err(), ValidationError::EmptyQuery);
    }

    #[test]
    fn units_parse_and_default() {
        assert_eq!(Units::default(), Units::Metric);
        assert_eq!(Units::try_from("Imperial").unwrap(), Units::Imperial);
        let err = Units::try_from("kelvin").unwrap_err();
        assert!(err.to_string().contains("Unknown unit system"));
    }

    #[test]
    fn with_units_keeps_target_and_source() {
        let coord = Coordinate::new(10.0, 20.0).unwrap();
        let req = WeatherRequest::by_coordinate(coord, Units::Metric, Source::Ip);
        let switched = req.with_units(Units::Imperial);

        assert_eq!(switched.target, Target::Coordinate(coord));
        assert_eq!(switched.source, Source::Ip);
        assert_eq!(switched.units, Units::Imperial);
    }

    #[test]
    fn manual_input_statuses() {
        assert!(OutcomeStatus::LocationUnavailable.needs_manual_input());
        assert!(OutcomeStatus::PermissionDenied.needs_manual_input());
        assert!(!OutcomeStatus::NotFound.needs_manual_input());
    }
}
