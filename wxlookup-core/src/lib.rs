//! Core library for the `wxlookup` CLI.
//!
//! This crate defines:
//! - Configuration handling (relay or direct upstream access)
//! - Location resolution: device capability, then IP fallback
//! - The OpenWeatherMap fetcher and its outcome classification
//! - Presentation of outcomes as display fields
//! - The lookup flow tying them together
//!
//! It is used by `wxlookup-cli`, but can also be reused by other front-ends.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod location;
pub mod lookup;
pub mod model;
pub mod presenter;

pub use config::{Config, Mode};
pub use error::{IpLookupError, ValidationError};
pub use fetcher::{Endpoint, WeatherFetcher, fetcher_from_config};
pub use location::{IpGeolocator, LocationFailure, LocationProvider, LocationResolver};
pub use lookup::{Phase, Report, Settled, WeatherLookup};
pub use model::{
    Coordinate, LocationQuery, OutcomeStatus, Source, Target, Units, WeatherRequest, WeatherResult,
};
pub use presenter::{DisplayModel, present};
