//! Device and IP-based location resolution.
//!
//! The device side is an injectable [`LocationProvider`] so the resolver can
//! run against a platform API, a fixed position, or a test double. When the
//! device cannot supply a position, the lookup flow falls back to an
//! [`IpGeolocator`].

use async_trait::async_trait;
use serde::Serialize;
use std::{fmt::Debug, sync::Arc, time::Duration};

use crate::{
    error::{IpLookupError, PermissionQueryError, PositionError},
    model::Coordinate,
};

pub mod ipapi;

pub use ipapi::IpApiLocator;

/// Fixed device position timeout. Not configurable per call.
pub const POSITION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub timeout: Duration,
    pub high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: POSITION_TIMEOUT,
            high_accuracy: true,
        }
    }
}

/// Platform geolocation capability.
#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    /// Whether the platform has a location capability at all.
    fn is_available(&self) -> bool;

    async fn query_permission(&self) -> Result<PermissionState, PermissionQueryError>;

    async fn request_position(&self, options: PositionOptions) -> Result<Coordinate, PositionError>;
}

/// Secondary resolver that locates the caller by public IP address.
#[async_trait]
pub trait IpGeolocator: Send + Sync + Debug {
    async fn locate(&self) -> Result<Coordinate, IpLookupError>;
}

/// Why automatic location did not produce a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationFailure {
    PermissionUnsupported,
    PermissionDenied,
    PositionTimeout,
    PositionUnavailable,
    IpLookupFailed,
}

impl LocationFailure {
    /// Short hint for the user. Not used for control flow.
    pub fn hint(&self) -> &'static str {
        match self {
            LocationFailure::PermissionUnsupported => "Geolocation is not supported on this device.",
            LocationFailure::PermissionDenied => {
                "Location permission is denied. You can allow location in your settings or enter a city below."
            }
            LocationFailure::PositionTimeout => "Location request timed out.",
            LocationFailure::PositionUnavailable => "Unable to retrieve device location.",
            LocationFailure::IpLookupFailed => "IP-based location lookup failed.",
        }
    }
}

impl From<PositionError> for LocationFailure {
    fn from(err: PositionError) -> Self {
        match err {
            PositionError::PermissionDenied => LocationFailure::PermissionDenied,
            PositionError::Timeout => LocationFailure::PositionTimeout,
            PositionError::Unavailable => LocationFailure::PositionUnavailable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Located(Coordinate),
    NeedsManualInput(LocationFailure),
}

/// Resolves the device position, checking permission state first.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    provider: Arc<dyn LocationProvider>,
}

impl LocationResolver {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self { provider }
    }

    pub async fn resolve(&self) -> Resolution {
        if !self.provider.is_available() {
            tracing::info!("No platform location capability");
            return Resolution::NeedsManualInput(LocationFailure::PermissionUnsupported);
        }

        match self.provider.query_permission().await {
            Ok(PermissionState::Denied) => {
                tracing::info!("Location permission denied, skipping position request");
                return Resolution::NeedsManualInput(LocationFailure::PermissionDenied);
            }
            Ok(state) => tracing::debug!(?state, "Location permission state"),
            Err(e) => tracing::debug!(error = %e, "Permission query unavailable, requesting position anyway"),
        }

        match self.provider.request_position(PositionOptions::default()).await {
            Ok(coord) => {
                tracing::info!(
                    lat = coord.latitude(),
                    lon = coord.longitude(),
                    "Device position resolved"
                );
                Resolution::Located(coord)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Device position request failed");
                Resolution::NeedsManualInput(e.into())
            }
        }
    }
}

/// Provider for platforms without any location capability, such as a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

#[async_trait]
impl LocationProvider for Unsupported {
    fn is_available(&self) -> bool {
        false
    }

    async fn query_permission(&self) -> Result<PermissionState, PermissionQueryError> {
        Err(PermissionQueryError::Unsupported)
    }

    async fn request_position(&self, _options: PositionOptions) -> Result<Coordinate, PositionError> {
        Err(PositionError::Unavailable)
    }
}

/// Provider that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub Coordinate);

#[async_trait]
impl LocationProvider for Fixed {
    fn is_available(&self) -> bool {
        true
    }

    async fn query_permission(&self) -> Result<PermissionState, PermissionQueryError> {
        Ok(PermissionState::Granted)
    }

    async fn request_position(&self, _options: PositionOptions) -> Result<Coordinate, PositionError> {
        Ok(self.0)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider that records how it was called.
    #[derive(Debug)]
    pub struct ScriptedProvider {
        pub available: bool,
        pub permission: Result<PermissionState, PermissionQueryError>,
        pub position: Result<Coordinate, PositionError>,
        pub position_calls: AtomicUsize,
        pub last_options: Mutex<Option<PositionOptions>>,
    }

    impl ScriptedProvider {
        pub fn new(
            permission: Result<PermissionState, PermissionQueryError>,
            position: Result<Coordinate, PositionError>,
        ) -> Self {
            Self {
                available: true,
                permission,
                position,
                position_calls: AtomicUsize::new(0),
                last_options: Mutex::new(None),
            }
        }

        pub fn position_calls(&self) -> usize {
            self.position_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LocationProvider for ScriptedProvider {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn query_permission(&self) -> Result<PermissionState, PermissionQueryError> {
            self.permission.clone()
        }

        async fn request_position(
            &self,
            options: PositionOptions,
        ) -> Result<Coordinate, PositionError> {
            self.position_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_options.lock() = Some(options);
            self.position.clone()
        }
    }
}
