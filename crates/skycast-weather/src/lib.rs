//! Weather lookups for SkyCast
//!
//! Resolves a place name or postal code to current conditions via the
//! OpenWeatherMap geocoding and weather APIs, with a pluggable forecast cache.

pub mod cache;
pub mod geocode;
pub mod provider;
pub mod resolver;
pub mod types;

pub use cache::{ForecastCache, MemoryCache, SqliteCache};
pub use provider::OpenWeatherClient;
pub use resolver::ForecastResolver;
pub use types::*;
