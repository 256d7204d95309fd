//! OpenWeatherMap HTTP client: geocoding and current weather.

use reqwest::Client;
use serde_json::Value;
use skycast_core::{WeatherConfig, DEFAULT_POSTAL_COUNTRY, OPENWEATHER_BASE_URL};
use std::time::Duration;
use tracing::instrument;

use crate::geocode::parse_geocode_body;
use crate::types::{Coordinates, ForecastError, Query, QueryKind, WeatherReport};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));

const GEOCODE_DIRECT_PATH: &str = "/geo/1.0/direct";
const GEOCODE_ZIP_PATH: &str = "/geo/1.0/zip";
const WEATHER_PATH: &str = "/data/2.5/weather";

impl WeatherReport {
    /// Pick the fields we surface out of a current-weather payload.
    ///
    /// Each field is read on its own: a missing or oddly shaped one comes back
    /// as `None` without affecting the others. The payload is kept either way.
    pub fn from_raw(raw: Value) -> Self {
        let humidity = raw
            .pointer("/main/humidity")
            .and_then(Value::as_f64)
            .filter(|h| (0.0..=f64::from(u8::MAX)).contains(h))
            .map(|h| h.round() as u8);

        Self {
            temperature: raw.pointer("/main/temp").and_then(Value::as_f64),
            feels_like: raw.pointer("/main/feels_like").and_then(Value::as_f64),
            humidity,
            description: raw
                .pointer("/weather/0/description")
                .and_then(Value::as_str)
                .map(str::to_string),
            raw,
        }
    }
}

/// Client for the OpenWeatherMap geocoding and weather endpoints.
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    postal_country: String,
}

// Keeps the API key out of debug output.
impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("postal_country", &self.postal_country)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl OpenWeatherClient {
    /// Create a client against the public API with the default timeout.
    pub fn new(api_key: Option<String>) -> Result<Self, ForecastError> {
        Self::with_timeout(api_key, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(api_key: Option<String>, timeout: Duration) -> Result<Self, ForecastError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: OPENWEATHER_BASE_URL.to_string(),
            postal_country: DEFAULT_POSTAL_COUNTRY.to_string(),
        })
    }

    /// Build a client from the `[weather]` config section.
    pub fn from_config(config: &WeatherConfig) -> Result<Self, ForecastError> {
        Ok(Self::with_timeout(config.api_key().map(str::to_string), config.timeout())?
            .with_base_url(&config.base_url)
            .with_postal_country(&config.postal_country))
    }

    /// Point the client at another host (a mock server, a proxy).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_postal_country(mut self, country: &str) -> Self {
        self.postal_country = country.trim().to_uppercase();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, ForecastError> {
        self.api_key
            .as_deref()
            .ok_or(ForecastError::MissingCredential)
    }

    /// Resolve a query to coordinates, choosing the endpoint by query kind.
    #[instrument(skip(self), level = "info")]
    pub async fn geocode(&self, query: &Query) -> Result<Coordinates, ForecastError> {
        let api_key = self.api_key()?;
        let coords = match query.kind() {
            QueryKind::PostalCode => {
                let zip = format!("{},{}", query.as_str(), self.postal_country);
                self.fetch_geocode(GEOCODE_ZIP_PATH, &[("zip", zip.as_str()), ("appid", api_key)])
                    .await?
            }
            QueryKind::PlaceName => {
                self.fetch_geocode(
                    GEOCODE_DIRECT_PATH,
                    &[("q", query.as_str()), ("limit", "1"), ("appid", api_key)],
                )
                .await?
            }
        };

        tracing::info!(
            "Geocoded to {} ({}, {})",
            coords.label(),
            coords.latitude,
            coords.longitude
        );
        Ok(coords)
    }

    async fn fetch_geocode(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Coordinates, ForecastError> {
        let url = format!("{}{}", self.base_url, path);

        let response = match self.client.get(&url).query(params).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Geocode request failed: {}", e.without_url());
                return Err(ForecastError::LocationNotFound);
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Geocode returned status {}", response.status());
            return Err(ForecastError::LocationNotFound);
        }

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Geocode body read failed: {}", e.without_url());
                return Err(ForecastError::LocationNotFound);
            }
        };

        parse_geocode_body(&body).ok_or(ForecastError::LocationNotFound)
    }

    /// Fetch current conditions in metric units.
    #[instrument(skip(self), level = "info")]
    pub async fn current_weather(
        &self,
        coords: &Coordinates,
    ) -> Result<WeatherReport, ForecastError> {
        let api_key = self.api_key()?;
        let url = format!("{}{}", self.base_url, WEATHER_PATH);
        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();

        let response = match self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Weather request failed: {}", e.without_url());
                return Err(ForecastError::WeatherUnavailable);
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Weather returned status {}", response.status());
            return Err(ForecastError::WeatherUnavailable);
        }

        let raw: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Weather body parse error: {}", e.without_url());
                return Err(ForecastError::WeatherUnavailable);
            }
        };

        Ok(WeatherReport::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hyderabad() -> Coordinates {
        Coordinates {
            latitude: 17.385,
            longitude: 78.4867,
            name: "Hyderabad".to_string(),
            country: "IN".to_string(),
        }
    }

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(Some("test_key".to_string()))
            .unwrap()
            .with_base_url(&server.uri())
    }

    #[test]
    fn test_report_from_full_payload() {
        let report = WeatherReport::from_raw(serde_json::json!({
            "main": {"temp": 30, "feels_like": 32, "humidity": 40},
            "weather": [{"description": "clear sky"}, {"description": "haze"}]
        }));

        assert_eq!(report.temperature, Some(30.0));
        assert_eq!(report.feels_like, Some(32.0));
        assert_eq!(report.humidity, Some(40));
        assert_eq!(report.description.as_deref(), Some("clear sky"));
    }

    #[test]
    fn test_report_from_sparse_payload() {
        let report = WeatherReport::from_raw(serde_json::json!({"cod": 200}));

        assert_eq!(report.temperature, None);
        assert_eq!(report.description, None);
        assert_eq!(report.raw["cod"], 200);
    }

    #[test]
    fn test_report_fractional_humidity_keeps_other_fields() {
        let report = WeatherReport::from_raw(serde_json::json!({
            "main": {"temp": 30, "feels_like": 32.5, "humidity": 40.5},
            "weather": [{"description": "clear sky"}]
        }));

        assert_eq!(report.temperature, Some(30.0));
        assert_eq!(report.feels_like, Some(32.5));
        assert_eq!(report.humidity, Some(41));
        assert_eq!(report.description.as_deref(), Some("clear sky"));
    }

    #[test]
    fn test_report_null_conditions_keep_main_fields() {
        let report = WeatherReport::from_raw(serde_json::json!({
            "main": {"temp": 21.3, "feels_like": 20.9, "humidity": 77},
            "weather": null
        }));

        assert_eq!(report.temperature, Some(21.3));
        assert_eq!(report.feels_like, Some(20.9));
        assert_eq!(report.humidity, Some(77));
        assert_eq!(report.description, None);
    }

    #[test]
    fn test_report_mistyped_field_is_dropped_alone() {
        let report = WeatherReport::from_raw(serde_json::json!({
            "main": {"temp": "hot", "feels_like": 32, "humidity": -5},
            "weather": [{"description": 7}]
        }));

        assert_eq!(report.temperature, None);
        assert_eq!(report.feels_like, Some(32.0));
        assert_eq!(report.humidity, None);
        assert_eq!(report.description, None);
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let client = OpenWeatherClient::new(Some("   ".to_string())).unwrap();
        assert!(!client.has_api_key());
    }

    #[test]
    fn test_debug_output_hides_api_key() {
        let client = OpenWeatherClient::new(Some("super-secret".to_string())).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("has_api_key: true"));
    }

    #[test]
    fn test_from_config_applies_settings() {
        let mut config = WeatherConfig::default();
        config.api_key = Some("k".to_string());
        config.base_url = "http://localhost:9999/".to_string();
        config.postal_country = "us".to_string();

        let client = OpenWeatherClient::from_config(&config).unwrap();
        assert!(client.has_api_key());
        assert_eq!(client.base_url, "http://localhost:9999");
        assert_eq!(client.postal_country, "US");
    }

    #[tokio::test]
    async fn test_geocode_postal_code_uses_zip_endpoint() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/zip"))
            .and(query_param("zip", "500001,IN"))
            .and(query_param("appid", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "zip": "500001", "name": "Hyderabad", "lat": 17.3753, "lon": 78.4744, "country": "IN"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let coords = client
            .geocode(&Query::parse("500001").unwrap())
            .await
            .unwrap();

        assert_eq!(coords.label(), "Hyderabad, IN");
    }

    #[tokio::test]
    async fn test_geocode_place_uses_direct_endpoint() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "new york"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "New York", "lat": 40.7128, "lon": -74.006, "country": "US"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let coords = client
            .geocode(&Query::parse("New York").unwrap())
            .await
            .unwrap();

        assert_eq!(coords.longitude, -74.006);
    }

    #[tokio::test]
    async fn test_geocode_unauthorized_is_location_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "cod": 401, "message": "Invalid API key"
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.geocode(&Query::parse("paris").unwrap()).await;

        assert!(matches!(result, Err(ForecastError::LocationNotFound)));
    }

    #[tokio::test]
    async fn test_geocode_connection_refused_is_location_not_found() {
        let client = OpenWeatherClient::new(Some("test_key".to_string()))
            .unwrap()
            .with_base_url("http://127.0.0.1:1");

        let result = client.geocode(&Query::parse("paris").unwrap()).await;

        assert!(matches!(result, Err(ForecastError::LocationNotFound)));
    }

    #[tokio::test]
    async fn test_current_weather_sends_metric_units() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "17.385"))
            .and(query_param("lon", "78.4867"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "main": {"temp": 30, "feels_like": 32, "humidity": 40},
                "weather": [{"description": "clear sky"}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let report = client.current_weather(&hyderabad()).await.unwrap();

        assert_eq!(report.temperature, Some(30.0));
        assert_eq!(report.description.as_deref(), Some("clear sky"));
    }

    #[tokio::test]
    async fn test_current_weather_non_json_is_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.current_weather(&hyderabad()).await;

        assert!(matches!(result, Err(ForecastError::WeatherUnavailable)));
    }
}
