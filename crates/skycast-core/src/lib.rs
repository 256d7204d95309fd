pub mod config;
pub mod error;

pub use config::{
    CacheBackend, CacheConfig, Config, ValidationResult, WeatherConfig, API_KEY_ENV,
    DEFAULT_CACHE_TTL_MINUTES, DEFAULT_POSTAL_COUNTRY, MAX_CACHE_TTL_MINUTES, OPENWEATHER_BASE_URL,
};
pub use error::{AppError, ConfigError};

use anyhow::Result;

/// Initialize logging for the binary.
///
/// Logs go to stderr so stdout only carries lookup output.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!("SkyCast core initialized");
    Ok(())
}
