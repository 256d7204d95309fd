use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the OpenWeatherMap API key.
pub const API_KEY_ENV: &str = "WEATHER_FORECAST_API_KEY";

/// Fixed upstream host for geocoding and weather lookups.
pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Country appended to postal-code lookups (`zip=<code>,<country>`).
pub const DEFAULT_POSTAL_COUNTRY: &str = "IN";

/// How long a resolved forecast stays fresh in the cache.
/// Upper bound accepted by `validate()` (one year).
pub const MAX_CACHE_TTL_MINUTES: u64 = 365 * 24 * 60;

pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 30;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const CACHE_FILE_NAME: &str = "forecast_cache.db";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `config.toml` and the default cache database
    #[serde(skip, default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Upstream weather settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Forecast cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key. Usually supplied through `WEATHER_FORECAST_API_KEY`
    /// rather than written to disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenWeatherMap API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// ISO 3166 country code used for postal-code lookups
    #[serde(default = "default_postal_country")]
    pub postal_country: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    OPENWEATHER_BASE_URL.to_string()
}

fn default_postal_country() -> String {
    DEFAULT_POSTAL_COUNTRY.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            postal_country: default_postal_country(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    /// The configured API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which store backs the forecast cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map, lost on exit
    Memory,
    /// SQLite file, shared between invocations
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Minutes a forecast stays fresh
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,

    /// SQLite file location (defaults to `<config_dir>/forecast_cache.db`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_ttl_minutes() -> u64 {
    DEFAULT_CACHE_TTL_MINUTES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            ttl_minutes: default_ttl_minutes(),
            path: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }

    /// Returns the SQLite path, falling back to a file inside `config_dir`.
    pub fn resolved_path(&self, config_dir: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| config_dir.join(CACHE_FILE_NAME))
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing defaults there if the file is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_dir);

        if !path.exists() {
            let config = Self {
                config_dir,
                ..Self::default()
            };
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_dir = config_dir;

        Ok(config)
    }

    /// Load configuration, apply environment overrides, and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if the file is unreadable or validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult), ConfigError> {
        let loaded = match path {
            Some(p) => Self::load_from(p),
            None => Self::load(),
        };
        let mut config = loaded.map_err(|e| ConfigError::Unreadable(format!("{:#}", e)))?;
        config.apply_env_overrides();

        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Overlay values supplied by `lookup` (an environment-like source).
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using API key from {}", API_KEY_ENV);
            self.weather.api_key = Some(key);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        let country = &self.weather.postal_country;
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            result.add_error(
                "weather.postal_country",
                format!("Expected a two-letter country code, got: {:?}", country),
            );
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 120 {
            result.add_warning(
                "weather.timeout_secs",
                "Timeout is unusually long (>120 seconds)",
            );
        }

        if self.cache.ttl_minutes == 0 {
            result.add_error("cache.ttl_minutes", "Cache TTL must be greater than 0");
        } else if self.cache.ttl_minutes > MAX_CACHE_TTL_MINUTES {
            result.add_error("cache.ttl_minutes", "Cache TTL must be at most one year");
        } else if self.cache.ttl_minutes > 1440 {
            result.add_warning("cache.ttl_minutes", "Cache TTL is more than 24 hours");
        }

        if self.weather.api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured; set {}", API_KEY_ENV),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
