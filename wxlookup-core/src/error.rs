//! Typed errors raised at component boundaries.
//!
//! None of these reach the user directly: the lookup flow converts each one
//! into an [`OutcomeStatus`](crate::model::OutcomeStatus) or a
//! [`LocationFailure`](crate::location::LocationFailure).

/// Rejected user or service input, raised before any network call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a city or postal code.")]
    EmptyQuery,
    #[error("Latitude {0} is outside -90..=90")]
    Latitude(f64),
    #[error("Longitude {0} is outside -180..=180")]
    Longitude(f64),
}

/// Failure reported by a device position request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location request timed out")]
    Timeout,
    #[error("Position unavailable")]
    Unavailable,
}

/// The permission-state query itself failed. Treated as "unknown, go ahead".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionQueryError {
    #[error("Permission query is not supported on this platform")]
    Unsupported,
    #[error("Permission query failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IpLookupError {
    #[error("IP geolocation request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IP geolocation returned status {0}")]
    Status(u16),
    #[error("IP geolocation response is malformed: {0}")]
    Malformed(String),
    #[error("IP geolocation returned invalid coordinates: {0}")]
    Invalid(#[from] ValidationError),
}

/// Failure to set up a fetcher. Raised at startup, never during a lookup.
#[derive(Debug, thiserror::Error)]
pub enum FetcherBuildError {
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
