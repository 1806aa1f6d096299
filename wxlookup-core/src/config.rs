use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{fetcher::Endpoint, model::Units};

/// Environment variable that overrides `api_key` from the config file.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_PROXY_URL: &str = "http://localhost:3000/weather";
pub const DEFAULT_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How requests reach the upstream weather API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Through a relay that keeps the API key server-side.
    #[default]
    Proxy,
    /// Straight to upstream with the key in the query string. Demo use only.
    Direct,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Proxy => f.write_str("proxy"),
            Mode::Direct => f.write_str("direct"),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// mode = "proxy"
/// proxy_url = "http://localhost:3000/weather"
/// units = "metric"
/// default_query = "New York"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: Mode,

    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Only used in direct mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,

    #[serde(default)]
    pub units: Units,

    /// City used by `show` when no query is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_query: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_proxy_url() -> String {
    DEFAULT_PROXY_URL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ip_lookup_url() -> String {
    DEFAULT_IP_LOOKUP_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            proxy_url: default_proxy_url(),
            api_url: default_api_url(),
            api_key: None,
            ip_lookup_url: default_ip_lookup_url(),
            units: Units::default(),
            default_query: None,
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "wxlookup", "wxlookup")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `OPENWEATHER_API_KEY` from the environment, if set.
    pub fn with_env_overrides(self) -> Self {
        self.with_api_key_override(std::env::var(API_KEY_ENV).ok())
    }

    fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the addressing mode into a concrete endpoint.
    pub fn endpoint(&self) -> Result<Endpoint> {
        match self.mode {
            Mode::Proxy => Ok(Endpoint::Proxied {
                url: self.proxy_url.clone(),
            }),
            Mode::Direct => {
                let api_key = self
                    .api_key
                    .as_deref()
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        anyhow!(
                            "Direct mode requires an API key.\n\
                             Hint: run `wxlookup configure` or set {API_KEY_ENV}."
                        )
                    })?;

                Ok(Endpoint::Direct {
                    url: self.api_url.clone(),
                    api_key: api_key.to_string(),
                })
            }
        }
    }

    /// Switch to direct mode with the given key.
    pub fn set_direct(&mut self, api_key: String) {
        self.mode = Mode::Direct;
        self.api_key = Some(api_key);
    }

    /// Switch to proxy mode. Any stored key is dropped.
    pub fn set_proxy(&mut self, proxy_url: String) {
        self.mode = Mode::Proxy;
        self.proxy_url = proxy_url;
        self.api_key = None;
    }
}
