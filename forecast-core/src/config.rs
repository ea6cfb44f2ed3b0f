use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    location::DEFAULT_LOOKUP_URL, model::TemperatureUnit, presenter::ForecastPolicy,
    provider::weatherbit::DEFAULT_BASE_URL,
};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "WEATHERBIT_API_KEY";

/// Largest forecast the provider's daily endpoint returns.
pub const MAX_DAYS: usize = 16;

/// Weatherbit connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self { api_key: None, base_url: default_base_url() }
    }
}

/// How the widget presents what it fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_num_of_days")]
    pub num_of_days: usize,

    #[serde(default)]
    pub forecast_policy: ForecastPolicy,

    #[serde(default)]
    pub unit: TemperatureUnit,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            num_of_days: default_num_of_days(),
            forecast_policy: ForecastPolicy::default(),
            unit: TemperatureUnit::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Look the position up from the public IP address.
    #[default]
    Ip,
    /// Use `latitude`/`longitude` from this file.
    Fixed,
    /// The host offers no location capability.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub source: LocationSource,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Whether the user agreed to an IP lookup. `None` means never asked.
    pub consent: Option<bool>,

    #[serde(default = "default_lookup_url")]
    pub lookup_url: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::default(),
            latitude: None,
            longitude: None,
            consent: None,
            lookup_url: default_lookup_url(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [provider]
/// api_key = "..."
///
/// [display]
/// num_of_days = 4
/// forecast_policy = "future_only"
///
/// [location]
/// source = "fixed"
/// latitude = 52.09
/// longitude = 5.12
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub location: LocationConfig,
}

impl Config {
    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Result<String> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
    }

    /// Same as [`Config::api_key`] with the environment value passed in.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Result<String> {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.provider.api_key.clone().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| {
                anyhow!(
                    "No Weatherbit API key configured.\n\
                     Hint: set {API_KEY_ENV} or run `forecast configure` and enter your API key."
                )
            })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.provider.api_key = Some(api_key);
    }

    /// Reject settings the widget cannot honour.
    pub fn validate(&self) -> Result<()> {
        let days = self.display.num_of_days;
        if days == 0 || days > MAX_DAYS {
            bail!("num_of_days must be between 1 and {MAX_DAYS}, got {days}");
        }

        if self.location.source == LocationSource::Fixed {
            match (self.location.latitude, self.location.longitude) {
                (Some(lat), Some(lon)) => {
                    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                        bail!("Fixed location ({lat}, {lon}) is out of range");
                    }
                }
                _ => bail!(
                    "Location source is `fixed` but latitude/longitude are missing.\n\
                     Hint: add both under [location] or pass --lat/--lon."
                ),
            }
        }

        Ok(())
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "forecast-widget", "forecast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_lookup_url() -> String {
    DEFAULT_LOOKUP_URL.to_string()
}

fn default_num_of_days() -> usize {
    3
}
