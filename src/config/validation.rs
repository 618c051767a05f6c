//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// The submission endpoint is not a valid URL.
    #[error("invalid survey url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse duration string using humantime.
///
/// Supports various formats: `30s`, `1m`, `5m30s`, `1h`, `2h30m`, `1d`, `100ms`, etc.
///
/// # Examples
///
/// ```
/// use survey_client::config::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap().as_secs(), 30);
/// assert_eq!(parse_duration("1h").unwrap().as_secs(), 3600);
/// assert_eq!(parse_duration("0s").unwrap().as_secs(), 0);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Parse a whole number of seconds as found in environment overrides.
///
/// # Errors
/// Returns `ConfigError::ValidationError` naming `key` when `value` is not a
/// non-negative integer.
pub fn parse_seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| {
            ConfigError::ValidationError(format!(
                "{key}: expected whole seconds, got '{value}'"
            ))
        })
}

/// Whether a toggle value switches a feature off (`false` or `no`).
pub fn is_switched_off(value: &str) -> bool {
    matches!(value.trim(), "false" | "no")
}
