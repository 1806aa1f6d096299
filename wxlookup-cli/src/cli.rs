use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, Select, Text};
use std::{future::Future, process::ExitCode, sync::Arc};
use tokio::task::JoinHandle;
use wxlookup_core::{
    Config, Coordinate, Mode, Report, Settled, Source, Units, WeatherLookup, location::Unsupported,
};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wxlookup", version, about = "Current weather for a place or for where you are")]
pub struct Cli {
    /// Show debug logs on stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Choose relay or direct access, default units and default city.
    Configure,

    /// Show weather for a city name or postal code.
    Show {
        /// City or postal code; falls back to the configured default city.
        query: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show weather for a coordinate pair.
    At {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Locate this machine (IP-based) and show its weather.
    Here {
        /// Do not ask for a city when the location cannot be determined.
        #[arg(long)]
        no_prompt: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// metric or imperial; defaults to the configured units.
    #[arg(long, value_parser = parse_units)]
    pub units: Option<Units>,

    /// Print the display model as JSON.
    #[arg(long)]
    pub json: bool,
}

fn parse_units(value: &str) -> Result<Units, String> {
    Units::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let (report, json) = match self.command {
            Command::Configure => {
                configure()?;
                return Ok(ExitCode::SUCCESS);
            }
            Command::Show { query, output } => {
                let (config, lookup) = setup()?;
                let query = query
                    .or_else(|| config.default_query.clone())
                    .ok_or_else(|| {
                        anyhow!(
                            "No city given and no default city configured.\n\
                             Hint: run `wxlookup show <city>` or `wxlookup configure`."
                        )
                    })?;
                let units = output.units.unwrap_or(config.units);
                let settled =
                    with_hints(&lookup, output.json, lookup.fetch_manual(&query, units)).await;
                (latest(settled)?, output.json)
            }
            Command::At { lat, lon, output } => {
                let (config, lookup) = setup()?;
                let coord = Coordinate::new(lat, lon)?;
                let units = output.units.unwrap_or(config.units);
                let settled = with_hints(
                    &lookup,
                    output.json,
                    lookup.fetch_at(coord, units, Source::Manual),
                )
                .await;
                (latest(settled)?, output.json)
            }
            Command::Here { no_prompt, output } => {
                let (config, lookup) = setup()?;
                let units = output.units.unwrap_or(config.units);
                let settled =
                    with_hints(&lookup, output.json, lookup.locate_and_fetch(units)).await;
                let report = latest(settled)?;

                if report.display.prompt_manual_input && !no_prompt && !output.json {
                    output::print_report(&report, false)?;
                    let query = Text::new("City or postal code:")
                        .prompt()
                        .context("Failed to read city")?;
                    let settled =
                        with_hints(&lookup, false, lookup.fetch_manual(&query, units)).await;
                    (latest(settled)?, false)
                } else {
                    (report, output.json)
                }
            }
        };

        output::print_report(&report, json)?;

        Ok(if report.display.is_error() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        })
    }
}

fn setup() -> anyhow::Result<(Config, WeatherLookup)> {
    let config = Config::load()?.with_env_overrides();
    tracing::debug!(mode = %config.mode, units = %config.units, "Loaded configuration");
    let lookup = WeatherLookup::from_config(&config, Arc::new(Unsupported))?;
    Ok((config, lookup))
}

fn latest(settled: Settled) -> anyhow::Result<Report> {
    settled
        .into_report()
        .ok_or_else(|| anyhow!("Lookup was superseded by a newer request"))
}

/// Run one lookup action, echoing progress hints to stderr.
async fn with_hints<F>(lookup: &WeatherLookup, quiet: bool, action: F) -> Settled
where
    F: Future<Output = Settled>,
{
    let hints = (!quiet).then(|| spawn_hint_printer(lookup));
    let settled = action.await;
    if let Some(handle) = hints {
        handle.abort();
    }
    settled
}

fn spawn_hint_printer(lookup: &WeatherLookup) -> JoinHandle<()> {
    let mut phases = lookup.subscribe();
    tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let hint = phases.borrow_and_update().hint();
            if !hint.is_empty() {
                eprintln!("{hint}");
            }
        }
    })
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let start = match config.mode {
        Mode::Proxy => 0,
        Mode::Direct => 1,
    };
    let mode = Select::new(
        "How should requests reach OpenWeatherMap?",
        vec![Mode::Proxy, Mode::Direct],
    )
    .with_starting_cursor(start)
    .with_help_message("proxy keeps the API key on a relay server; direct stores it on this machine")
    .prompt()
    .context("Failed to read mode")?;

    match mode {
        Mode::Proxy => {
            let url = Text::new("Relay URL:")
                .with_default(&config.proxy_url)
                .prompt()
                .context("Failed to read relay URL")?;
            config.set_proxy(url.trim().to_string());
        }
        Mode::Direct => {
            let key = Password::new("OpenWeatherMap API key:")
                .without_confirmation()
                .prompt()
                .context("Failed to read API key")?;
            let key = key.trim();
            if key.is_empty() {
                bail!("API key must not be empty");
            }
            config.set_direct(key.to_string());
        }
    }

    let units_start = match config.units {
        Units::Metric => 0,
        Units::Imperial => 1,
    };
    config.units = Select::new("Default units:", vec![Units::Metric, Units::Imperial])
        .with_starting_cursor(units_start)
        .prompt()
        .context("Failed to read units")?;

    let default_query = Text::new("Default city (optional):")
        .with_default(config.default_query.as_deref().unwrap_or(""))
        .prompt()
        .context("Failed to read default city")?;
    let default_query = default_query.trim();
    config.default_query = (!default_query.is_empty()).then(|| default_query.to_string());

    // Fails early on a relay URL that won't parse or a missing key.
    wxlookup_core::fetcher_from_config(&config)?;

    config.save()?;
    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}
