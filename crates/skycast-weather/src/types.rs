use serde::{Deserialize, Serialize};
use skycast_core::AppError;

/// How a query is sent to the geocoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// All ASCII digits, looked up through the postal-code endpoint
    PostalCode,
    /// Anything else, looked up through the free-text endpoint
    PlaceName,
}

/// Normalized user input: trimmed and lowercased.
///
/// The normalized text doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    kind: QueryKind,
}

impl Query {
    /// Normalize raw input, rejecting blank strings.
    pub fn parse(input: &str) -> Result<Self, ForecastError> {
        let text = input.trim().to_lowercase();
        if text.is_empty() {
            return Err(ForecastError::EmptyInput);
        }

        let kind = if text.bytes().all(|b| b.is_ascii_digit()) {
            QueryKind::PostalCode
        } else {
            QueryKind::PlaceName
        };

        Ok(Self { text, kind })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }
}

/// A geocoded place. Only lives between the geocode and weather calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub country: String,
}

impl Coordinates {
    /// Display label, e.g. "Hyderabad, IN"
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

/// Fields pulled out of a current-weather response, plus the body itself.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<u8>,
    pub description: Option<String>,
    pub raw: serde_json::Value,
}

/// Normalized weather lookup result. This is what gets cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// "<name>, <country>"
    pub location: String,
    /// Degrees Celsius
    #[serde(rename = "temp")]
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<u8>,
    pub description: Option<String>,
    /// Set when the value was served from the cache rather than fetched
    #[serde(default)]
    pub from_cache: bool,
    /// Upstream current-weather payload, untouched
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl Forecast {
    /// Combine a geocode hit and a weather report into a fresh forecast.
    pub fn assemble(coords: &Coordinates, report: WeatherReport) -> Self {
        Self {
            location: coords.label(),
            temperature: report.temperature,
            feels_like: report.feels_like,
            humidity: report.humidity,
            description: report.description,
            from_cache: false,
            raw: report.raw,
        }
    }
}

/// Terminal failures of a forecast lookup.
///
/// The display strings are shown to users as-is.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Please enter data to search for the weather forecast")]
    EmptyInput,
    #[error("API key missing")]
    MissingCredential,
    #[error("Location not found")]
    LocationNotFound,
    #[error("Unable to fetch weather")]
    WeatherUnavailable,
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl ForecastError {
    /// Stable tag for machine-readable output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::MissingCredential => "missing_credential",
            Self::LocationNotFound => "location_not_found",
            Self::WeatherUnavailable => "weather_unavailable",
            Self::Client(_) => "client",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Client(_) => "Unable to start the weather client.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ForecastError> for AppError {
    fn from(e: ForecastError) -> Self {
        if let ForecastError::Client(inner) = &e {
            tracing::error!("HTTP client error: {}", inner);
        }
        AppError::Lookup {
            code: e.code(),
            message: e.user_message(),
        }
    }
}
