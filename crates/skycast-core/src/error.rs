//! Application-level error types for SkyCast.
//!
//! Library crates keep their own precise error enums; everything that reaches
//! the binary is converted into [`AppError`], which knows how to present itself
//! to a user and which stable code to report in machine-readable output.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` for display and `code()` for JSON output.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A forecast lookup ended in a terminal, user-facing failure.
    #[error("{message}")]
    Lookup { code: &'static str, message: String },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a message suitable for showing to the person who ran the lookup.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Lookup { message, .. } => message.clone(),
            AppError::Cache(_) => "Local forecast cache is unavailable.".to_string(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.".to_string(),
        }
    }

    /// Stable machine-readable tag for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Lookup { code, .. } => code,
            AppError::Cache(_) => "cache",
            AppError::Other(_) => "internal",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to load configuration: {0}")]
    Unreadable(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Unreadable(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let cfg_err = ConfigError::Invalid("cache.ttl_minutes".into());
        let app_err: AppError = cfg_err.into();
        assert!(matches!(app_err, AppError::Config(ConfigError::Invalid(_))));
        assert_eq!(app_err.code(), "config");
    }

    #[test]
    fn test_lookup_message_is_passed_through() {
        let err = AppError::Lookup {
            code: "location_not_found",
            message: "Location not found".to_string(),
        };
        assert_eq!(err.user_message(), "Location not found");
        assert_eq!(err.to_string(), "Location not found");
        assert_eq!(err.code(), "location_not_found");
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Config(ConfigError::Unreadable("bad toml".into()));
        assert_eq!(
            app_err.user_message(),
            "Configuration file is malformed. Check your settings."
        );
    }
}
