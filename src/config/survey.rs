//! Survey client configuration.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::logger::{Logger, TracingLogger};

use super::validation::{ConfigError, is_switched_off, parse_seconds};

// =============================================================================
// Constants
// =============================================================================

/// Default submission endpoint.
pub const DEFAULT_URL: &str = "https://stats.kopano.io/api/stats/v1/submit";

/// Default wait before the first submission (60 seconds).
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(60);

/// Default wait after a failed submission (60 seconds).
pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_secs(60);

/// Default wait between submissions (1 hour).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);

pub const ENV_URL: &str = "SURVEYCLIENT_URL";
pub const ENV_START_DELAY: &str = "SURVEYCLIENT_START_DELAY";
pub const ENV_ERROR_DELAY: &str = "SURVEYCLIENT_ERROR_DELAY";
pub const ENV_INTERVAL: &str = "SURVEYCLIENT_INTERVAL";
pub const ENV_INSECURE: &str = "SURVEYCLIENT_INSECURE";
pub const ENV_USER_AGENT: &str = "SURVEYCLIENT_USER_AGENT";
pub const ENV_ENABLED: &str = "SURVEYCLIENT_ENABLED";
pub const ENV_AUTOSURVEY: &str = "SURVEYCLIENT_AUTOSURVEY";
pub const ENV_HASH_GUID: &str = "SURVEYCLIENT_HASH_GUID";

/// User agent sent when none is configured.
pub fn default_user_agent() -> Option<String> {
    Some(format!("survey-client/{}", env!("CARGO_PKG_VERSION")))
}

fn default_logger() -> Option<Arc<dyn Logger>> {
    Some(Arc::new(TracingLogger))
}

// =============================================================================
// Submission Switch
// =============================================================================

/// Kill switch for submissions.
///
/// Clones share state. The survey client reads the switch before every
/// attempt, so flipping it takes effect on the next cycle.
#[derive(Debug, Clone)]
pub struct SubmissionSwitch {
    enabled: Arc<AtomicBool>,
}

impl Default for SubmissionSwitch {
    fn default() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl SubmissionSwitch {
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Survey Configuration
// =============================================================================

/// Settings consumed by [`SurveyClient`](crate::client::SurveyClient) at
/// construction.
///
/// A zero `interval` submits exactly once. `insecure` and `http_client` are
/// mutually exclusive. Cloning copies all plain values; `logger`,
/// `http_client` and `switch` are shared handles.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Submission endpoint.
    pub url: String,

    /// Wait before the first submission (default: 60s).
    #[serde(with = "humantime_serde")]
    pub start_delay: Duration,

    /// Wait after a failed submission; zero falls back to `interval` (default: 60s).
    #[serde(with = "humantime_serde")]
    pub error_delay: Duration,

    /// Wait between submissions; zero means run once (default: 1h).
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Skip TLS certificate verification.
    pub insecure: bool,

    /// User-Agent header value.
    pub user_agent: Option<String>,

    /// Failure message sink; `None` silences failures.
    #[serde(skip, default = "default_logger")]
    pub logger: Option<Arc<dyn Logger>>,

    /// Preconfigured HTTP client replacing the built-in transport.
    #[serde(skip)]
    pub http_client: Option<reqwest::Client>,

    /// Submission kill switch.
    #[serde(skip)]
    pub switch: SubmissionSwitch,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            start_delay: DEFAULT_START_DELAY,
            error_delay: DEFAULT_ERROR_DELAY,
            interval: DEFAULT_INTERVAL,
            insecure: false,
            user_agent: default_user_agent(),
            logger: default_logger(),
            http_client: None,
            switch: SubmissionSwitch::default(),
        }
    }
}

impl std::fmt::Debug for SurveyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurveyConfig")
            .field("url", &self.url)
            .field("start_delay", &self.start_delay)
            .field("error_delay", &self.error_delay)
            .field("interval", &self.interval)
            .field("insecure", &self.insecure)
            .field("user_agent", &self.user_agent)
            .field("has_logger", &self.logger.is_some())
            .field("has_http_client", &self.http_client.is_some())
            .field("enabled", &self.switch.is_enabled())
            .finish()
    }
}

impl SurveyConfig {
    /// Defaults with overrides from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` if an override holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a YAML file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SURVEYCLIENT_*` overrides resolved through `lookup`.
    ///
    /// Delays and interval are whole seconds. `SURVEYCLIENT_INSECURE=yes`
    /// enables insecure TLS and `SURVEYCLIENT_ENABLED=false|no` turns the
    /// submission switch off.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = lookup(ENV_URL) {
            self.url = url;
        }
        if let Some(v) = lookup(ENV_START_DELAY) {
            self.start_delay = parse_seconds(ENV_START_DELAY, &v)?;
        }
        if let Some(v) = lookup(ENV_ERROR_DELAY) {
            self.error_delay = parse_seconds(ENV_ERROR_DELAY, &v)?;
        }
        if let Some(v) = lookup(ENV_INTERVAL) {
            self.interval = parse_seconds(ENV_INTERVAL, &v)?;
        }
        if let Some(v) = lookup(ENV_INSECURE) {
            self.insecure = v.trim() == "yes";
        }
        if let Some(v) = lookup(ENV_USER_AGENT) {
            self.user_agent = Some(v);
        }
        if lookup(ENV_ENABLED).is_some_and(|v| is_switched_off(&v)) {
            self.switch.disable();
        }
        Ok(())
    }

    /// Validate configuration values and return the parsed endpoint.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidUrl` for an unparsable URL and
    /// `ConfigError::ValidationError` for a non-HTTP scheme or when both
    /// `http_client` and `insecure` are set.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "unsupported survey url scheme: '{}'",
                url.scheme()
            )));
        }

        if self.http_client.is_some() && self.insecure {
            return Err(ConfigError::ValidationError(
                "inconsistent configuration, either set http_client or insecure".to_string(),
            ));
        }

        Ok(url)
    }

    /// Set the submission endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the start delay.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Set the error delay.
    pub fn with_error_delay(mut self, delay: Duration) -> Self {
        self.error_delay = delay;
        self
    }

    /// Set the interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the failure logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_survey_config_default() {
        let config = SurveyConfig::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.start_delay, DEFAULT_START_DELAY);
        assert_eq!(config.error_delay, DEFAULT_ERROR_DELAY);
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert!(!config.insecure);
        assert!(config.logger.is_some());
        assert!(config.switch.is_enabled());
        assert!(config.user_agent.unwrap().starts_with("survey-client/"));
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = SurveyConfig::default();
        config
            .apply_env(lookup(&[
                (ENV_URL, "http://127.0.0.1:9000/submit"),
                (ENV_START_DELAY, "0"),
                (ENV_ERROR_DELAY, "5"),
                (ENV_INTERVAL, "120"),
                (ENV_INSECURE, "yes"),
                (ENV_ENABLED, "no"),
            ]))
            .unwrap();

        assert_eq!(config.url, "http://127.0.0.1:9000/submit");
        assert_eq!(config.start_delay, Duration::ZERO);
        assert_eq!(config.error_delay, Duration::from_secs(5));
        assert_eq!(config.interval, Duration::from_secs(120));
        assert!(config.insecure);
        assert!(!config.switch.is_enabled());
    }

    #[test]
    fn test_apply_env_empty_values_ignored() {
        let mut config = SurveyConfig::default();
        config
            .apply_env(lookup(&[(ENV_URL, ""), (ENV_INTERVAL, "")]))
            .unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.interval, DEFAULT_INTERVAL);
    }

    #[test]
    fn test_apply_env_invalid_seconds() {
        let mut config = SurveyConfig::default();
        let err = config
            .apply_env(lookup(&[(ENV_INTERVAL, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_INTERVAL));
    }

    #[test]
    fn test_clone_is_independent_for_plain_values() {
        let original = SurveyConfig::default();
        let mut clone = original.clone();
        clone.url = "http://other".to_string();
        clone.interval = Duration::ZERO;
        clone.insecure = true;

        assert_eq!(original.url, DEFAULT_URL);
        assert_eq!(original.interval, DEFAULT_INTERVAL);
        assert!(!original.insecure);

        // The switch is a shared handle.
        clone.switch.disable();
        assert!(!original.switch.is_enabled());
    }

    #[test]
    fn test_validate() {
        assert!(SurveyConfig::default().validate().is_ok());

        let bad = SurveyConfig::default().with_url("not a url");
        assert!(matches!(bad.validate(), Err(ConfigError::InvalidUrl(_))));

        let ftp = SurveyConfig::default().with_url("ftp://example.com/");
        assert!(ftp.validate().unwrap_err().to_string().contains("scheme"));

        let mut both = SurveyConfig::default().with_http_client(reqwest::Client::new());
        both.insecure = true;
        assert!(
            both.validate()
                .unwrap_err()
                .to_string()
                .contains("inconsistent configuration")
        );
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "url: http://localhost:8080/submit\nstart_delay: 0s\ninterval: 5m\nuser_agent: test/1.0"
        )
        .unwrap();

        let config = SurveyConfig::load(file.path()).unwrap();

        assert_eq!(config.url, "http://localhost:8080/submit");
        assert_eq!(config.start_delay, Duration::ZERO);
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.error_delay, DEFAULT_ERROR_DELAY);
        assert_eq!(config.user_agent.as_deref(), Some("test/1.0"));
        assert!(config.logger.is_some());
    }

    #[test]
    fn test_load_yaml_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval: [1, 2]").unwrap();
        assert!(matches!(
            SurveyConfig::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
