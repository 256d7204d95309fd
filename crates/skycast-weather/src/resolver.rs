//! Cache-aside forecast lookup: normalize, check cache, geocode, fetch weather, store.

use skycast_core::{AppError, CacheBackend, Config};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{ForecastCache, MemoryCache, SqliteCache};
use crate::provider::OpenWeatherClient;
use crate::types::{Forecast, ForecastError, Query};

/// Resolves free-text places and postal codes to current weather.
///
/// Cheap to share behind an `Arc`; independent lookups may run concurrently.
pub struct ForecastResolver {
    client: OpenWeatherClient,
    cache: Arc<dyn ForecastCache>,
    ttl: Duration,
}

impl ForecastResolver {
    pub fn new(client: OpenWeatherClient, cache: Arc<dyn ForecastCache>, ttl: Duration) -> Self {
        Self { client, cache, ttl }
    }

    /// Build a resolver with the client and cache backend described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let client = OpenWeatherClient::from_config(&config.weather)?;

        let cache: Arc<dyn ForecastCache> = match config.cache.backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::Sqlite => {
                let path = config.cache.resolved_path(&config.config_dir);
                tracing::debug!("Opening forecast cache at {}", path.display());
                let cache =
                    SqliteCache::new(&path).map_err(|e| AppError::Cache(format!("{:#}", e)))?;
                Arc::new(cache)
            }
        };

        Ok(Self::new(client, cache, config.cache.ttl()))
    }

    /// Look up current weather for `input`.
    ///
    /// Fails fast on blank input or a missing API key without touching the
    /// network. A fresh cache entry is returned with `from_cache` set; otherwise
    /// the geocode and weather calls run in sequence and a successful result is
    /// cached under the normalized input.
    pub async fn resolve(&self, input: &str) -> Result<Forecast, ForecastError> {
        let query = Query::parse(input)?;

        if !self.client.has_api_key() {
            return Err(ForecastError::MissingCredential);
        }

        if let Some(mut cached) = self.cached(&query).await {
            tracing::debug!("Cache hit for {:?}", query.as_str());
            cached.from_cache = true;
            return Ok(cached);
        }
        tracing::debug!("Cache miss for {:?}", query.as_str());

        let coords = self.client.geocode(&query).await?;
        let report = self.client.current_weather(&coords).await?;
        let forecast = Forecast::assemble(&coords, report);

        self.store(&query, &forecast).await;
        Ok(forecast)
    }

    /// Read through the cache. Backend faults count as a miss.
    async fn cached(&self, query: &Query) -> Option<Forecast> {
        let cache = Arc::clone(&self.cache);
        let key = query.as_str().to_string();

        match tokio::task::spawn_blocking(move || cache.get(&key)).await {
            Ok(Ok(hit)) => hit,
            Ok(Err(e)) => {
                tracing::warn!("Forecast cache read failed: {:#}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Forecast cache read task failed: {}", e);
                None
            }
        }
    }

    /// Write a fresh result. Failures are logged; the caller still gets the forecast.
    async fn store(&self, query: &Query, forecast: &Forecast) {
        let cache = Arc::clone(&self.cache);
        let key = query.as_str().to_string();
        let value = forecast.clone();
        let ttl = self.ttl;

        match tokio::task::spawn_blocking(move || cache.set(&key, &value, ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Forecast cache write failed: {:#}", e),
            Err(e) => tracing::warn!("Forecast cache write task failed: {}", e),
        }
    }
}
