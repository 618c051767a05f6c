//! Opt-in convenience starter.
//!
//! [`AutoSurvey`] bundles a registry with the built-in collectors, a
//! [`SurveyConfig`] and the guid hashing policy. The host application calls
//! [`AutoSurvey::start`] once during its own startup and owns the
//! cancellation token.
//!
//! ```rust,no_run
//! use survey_client::AutoSurvey;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancellationToken::new();
//! let survey = AutoSurvey::from_env()?;
//! survey.start(cancel.clone(), "kapid", "1.4.0", b"installation-guid", Vec::new())?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, SurveyClient};
use crate::collector::{Collector, ProgramCollector, Registry, RegistryError};
use crate::config::{ConfigError, ENV_AUTOSURVEY, ENV_HASH_GUID, SurveyConfig, is_switched_off};
use crate::guid::HashVersion;

/// Errors raised by [`AutoSurvey::start`].
#[derive(Debug, Error)]
pub enum AutoSurveyError {
    /// `start` was already called.
    #[error("auto survey already started")]
    AlreadyStarted,

    /// Environment configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A collector could not be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The survey client could not be started.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// One-shot starter for a standard survey client.
#[derive(Debug)]
pub struct AutoSurvey {
    registry: Arc<Registry>,
    config: SurveyConfig,
    hash: HashVersion,
    enabled: bool,
    started: AtomicBool,
}

impl AutoSurvey {
    /// Create a starter using `registry` and `config`, hashing guids with
    /// [`HashVersion::V1`].
    pub fn new(registry: Arc<Registry>, config: SurveyConfig) -> Self {
        Self {
            registry,
            config,
            hash: HashVersion::default(),
            enabled: true,
            started: AtomicBool::new(false),
        }
    }

    /// Standard starter configured from the process environment.
    ///
    /// Uses [`Registry::with_defaults`] and [`SurveyConfig::from_env`].
    /// `SURVEYCLIENT_AUTOSURVEY=false|no` disables starting and
    /// `SURVEYCLIENT_HASH_GUID` selects the guid hash version.
    pub fn from_env() -> Result<Self, AutoSurveyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with variables resolved by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AutoSurveyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SurveyConfig::default();
        config.apply_env(&lookup)?;

        let mut survey = Self::new(Arc::new(Registry::with_defaults()), config);
        if let Some(v) = lookup(ENV_HASH_GUID) {
            survey.hash = v.parse()?;
        }
        if lookup(ENV_AUTOSURVEY).is_some_and(|v| is_switched_off(&v)) {
            survey.enabled = false;
        }
        Ok(survey)
    }

    /// Select the guid hash version.
    pub fn with_hash_version(mut self, hash: HashVersion) -> Self {
        self.hash = hash;
        self
    }

    /// Enable or disable starting.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Register program information plus `collectors` and start submitting.
    ///
    /// `guid` is hashed according to the configured [`HashVersion`]; an empty
    /// guid is not reported. Returns `Ok(None)` when disabled.
    ///
    /// # Errors
    /// Returns `AutoSurveyError::AlreadyStarted` on every call after the
    /// first, even when disabled.
    pub fn start(
        &self,
        cancel: CancellationToken,
        name: &str,
        version: &str,
        guid: &[u8],
        collectors: Vec<Arc<dyn Collector>>,
    ) -> Result<Option<JoinHandle<()>>, AutoSurveyError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(AutoSurveyError::AlreadyStarted);
        }
        if !self.enabled {
            tracing::info!("Auto survey disabled");
            return Ok(None);
        }

        let guid = (!guid.is_empty()).then(|| self.hash.apply(guid));
        self.registry
            .register(ProgramCollector::new(name, version, guid))?;
        for collector in collectors {
            self.registry.register_arc(collector)?;
        }

        let client = SurveyClient::new(&self.config, Arc::clone(&self.registry))?;
        Ok(Some(client.start(cancel)?))
    }
}
