//! The lookup flow: locate, fetch, present.
//!
//! Each public method is one user action. Actions are numbered; only the
//! most recently started action may publish its result; anything that
//! completes after a newer action began is reported as
//! [`Settled::Superseded`] and dropped.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::watch;

use crate::{
    Config,
    fetcher::{WeatherFetcher, fetcher_from_config},
    location::{
        IpApiLocator, IpGeolocator, LocationFailure, LocationProvider, LocationResolver,
        Resolution,
    },
    model::{Coordinate, LocationQuery, OutcomeStatus, Source, Target, Units, WeatherRequest},
    presenter::{DisplayModel, present, present_validation_error},
};

/// Where the current action is. Published on a watch channel for progress hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    ResolvingByIp,
    Fetching {
        source: Source,
        query: Option<String>,
    },
    Displaying,
    ShowingError,
}

impl Phase {
    pub fn hint(&self) -> String {
        match self {
            Phase::Idle | Phase::Displaying | Phase::ShowingError => String::new(),
            Phase::Resolving => "Checking location permission...".to_string(),
            Phase::ResolvingByIp => "Falling back to IP-based location...".to_string(),
            Phase::Fetching {
                query: Some(query), ..
            } => format!("Fetching weather for \"{query}\"..."),
            Phase::Fetching { source, query: None } => format!("Fetching weather ({source})..."),
        }
    }
}

/// What one action produced.
#[derive(Debug, Clone)]
pub struct Report {
    pub generation: u64,
    /// `None` when input was rejected before any request.
    pub outcome: Option<OutcomeStatus>,
    /// Why device location did not work, when it was attempted and failed.
    pub location_failure: Option<LocationFailure>,
    pub display: DisplayModel,
}

#[derive(Debug, Clone)]
pub enum Settled {
    Latest(Report),
    Superseded { generation: u64 },
}

impl Settled {
    pub fn report(&self) -> Option<&Report> {
        match self {
            Settled::Latest(report) => Some(report),
            Settled::Superseded { .. } => None,
        }
    }

    pub fn into_report(self) -> Option<Report> {
        match self {
            Settled::Latest(report) => Some(report),
            Settled::Superseded { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct WeatherLookup {
    resolver: LocationResolver,
    ip: Arc<dyn IpGeolocator>,
    fetcher: Arc<dyn WeatherFetcher>,
    latest: AtomicU64,
    last_request: Mutex<Option<WeatherRequest>>,
    phase: watch::Sender<Phase>,
}

impl WeatherLookup {
    pub fn new(
        device: Arc<dyn LocationProvider>,
        ip: Arc<dyn IpGeolocator>,
        fetcher: Arc<dyn WeatherFetcher>,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            resolver: LocationResolver::new(device),
            ip,
            fetcher,
            latest: AtomicU64::new(0),
            last_request: Mutex::new(None),
            phase,
        }
    }

    /// Build the IP locator and weather fetcher described by the config.
    pub fn from_config(config: &Config, device: Arc<dyn LocationProvider>) -> anyhow::Result<Self> {
        let ip = IpApiLocator::new(config.ip_lookup_url.clone(), config.request_timeout())?;
        let fetcher = fetcher_from_config(config)?;
        Ok(Self::new(device, Arc::new(ip), fetcher))
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.phase.borrow().clone()
    }

    /// Device location, then IP fallback, then weather for the coordinate.
    ///
    /// Stops with `PermissionDenied` or `LocationUnavailable` when neither
    /// source yields a position; no weather request is made in that case.
    pub async fn locate_and_fetch(&self, units: Units) -> Settled {
        let generation = self.begin();
        self.set_phase(generation, Phase::Resolving);

        let (coord, source, device_failure) = match self.resolver.resolve().await {
            Resolution::Located(coord) => (coord, Source::Device, None),
            Resolution::NeedsManualInput(failure) => {
                tracing::info!(reason = ?failure, "Device location failed, trying IP lookup");
                self.set_phase(generation, Phase::ResolvingByIp);

                match self.ip.locate().await {
                    Ok(coord) => (coord, Source::Ip, Some(failure)),
                    Err(e) => {
                        tracing::warn!(error = %e, "IP lookup failed; manual input required");
                        let outcome = match failure {
                            LocationFailure::PermissionDenied => OutcomeStatus::PermissionDenied,
                            _ => OutcomeStatus::LocationUnavailable,
                        };
                        return self.settle(generation, None, Some(outcome), Some(failure));
                    }
                }
            }
        };

        let request = WeatherRequest::by_coordinate(coord, units, source);
        self.run(generation, request, device_failure).await
    }

    /// Manual path. Blank input is rejected without touching the network.
    pub async fn fetch_manual(&self, input: &str, units: Units) -> Settled {
        let generation = self.begin();

        match LocationQuery::parse(input) {
            Ok(query) => {
                self.run(generation, WeatherRequest::by_query(query, units), None)
                    .await
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rejected manual input");
                if !self.is_latest(generation) {
                    return Settled::Superseded { generation };
                }
                self.set_phase(generation, Phase::ShowingError);
                Settled::Latest(Report {
                    generation,
                    outcome: None,
                    location_failure: None,
                    display: present_validation_error(&e),
                })
            }
        }
    }

    /// Weather for an already known coordinate.
    pub async fn fetch_at(&self, coord: Coordinate, units: Units, source: Source) -> Settled {
        let generation = self.begin();
        self.run(generation, WeatherRequest::by_coordinate(coord, units, source), None)
            .await
    }

    /// Repeat the last successful request in another unit system.
    ///
    /// Returns `None` when nothing has been shown yet.
    pub async fn change_units(&self, units: Units) -> Option<Settled> {
        let request = self.last_request.lock().as_ref()?.with_units(units);
        let generation = self.begin();
        Some(self.run(generation, request, None).await)
    }

    async fn run(
        &self,
        generation: u64,
        request: WeatherRequest,
        location_failure: Option<LocationFailure>,
    ) -> Settled {
        let query = match &request.target {
            Target::Query(q) => Some(q.to_string()),
            Target::Coordinate(_) => None,
        };
        self.set_phase(
            generation,
            Phase::Fetching {
                source: request.source,
                query,
            },
        );

        let outcome = self.fetcher.fetch(&request).await;
        tracing::info!(generation, outcome = outcome.kind(), source = %request.source, "Lookup finished");

        self.settle(generation, Some(request), Some(outcome), location_failure)
    }

    fn settle(
        &self,
        generation: u64,
        request: Option<WeatherRequest>,
        outcome: Option<OutcomeStatus>,
        location_failure: Option<LocationFailure>,
    ) -> Settled {
        let mut last = self.last_request.lock();
        if !self.is_latest(generation) {
            tracing::debug!(generation, "Discarding result of superseded action");
            return Settled::Superseded { generation };
        }

        let display = match &outcome {
            Some(outcome) => present(outcome),
            None => DisplayModel {
                result: None,
                message: None,
                prompt_manual_input: false,
            },
        };

        if let (Some(request), Some(OutcomeStatus::Success(_))) = (request, &outcome) {
            *last = Some(request);
        }
        drop(last);

        let phase = if display.result.is_some() {
            Phase::Displaying
        } else {
            Phase::ShowingError
        };
        self.set_phase(generation, phase);

        Settled::Latest(Report {
            generation,
            outcome,
            location_failure,
            display,
        })
    }

    fn begin(&self) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.phase.send_replace(Phase::Idle);
        generation
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }

    fn set_phase(&self, generation: u64, phase: Phase) {
        if self.is_latest(generation) {
            tracing::debug!(generation, ?phase, "Phase");
            self.phase.send_replace(phase);
        }
    }
}
