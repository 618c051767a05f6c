//! Survey client run loop and submission attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::collector::Registry;
use crate::config::{SubmissionSwitch, SurveyConfig};
use crate::logger::Logger;

use super::error::{ClientError, SubmitError};
use super::payload::Payload;

/// Marker header identifying a stats submission.
pub const STATS_REQUEST_HEADER: &str = "X-Kopano-Stats-Request";

/// Overall timeout of one submission request (60 seconds).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for establishing a connection, TLS handshake included (30 seconds).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Periodic survey submitter.
///
/// Cheap to clone; clones share the started latch. A client can be started
/// once. After its cancellation token fires it does not restart.
#[derive(Clone)]
pub struct SurveyClient {
    inner: Arc<Inner>,
}

struct Inner {
    url: Url,
    start_delay: Duration,
    error_delay: Duration,
    interval: Duration,
    user_agent: Option<String>,
    registry: Arc<Registry>,
    http: reqwest::Client,
    logger: Option<Arc<dyn Logger>>,
    switch: SubmissionSwitch,
    started: AtomicBool,
}

impl SurveyClient {
    /// Create a survey client submitting the metrics of `registry`.
    ///
    /// # Errors
    /// Returns `ClientError::Config` for an invalid URL or when both a custom
    /// HTTP client and `insecure` are configured, and
    /// `ClientError::HttpClient` if the transport cannot be built.
    pub fn new(config: &SurveyConfig, registry: Arc<Registry>) -> Result<Self, ClientError> {
        let url = config.validate()?;
        let http = match &config.http_client {
            Some(client) => client.clone(),
            None => build_transport(config.insecure)?,
        };

        Ok(Self {
            inner: Arc::new(Inner {
                url,
                start_delay: config.start_delay,
                error_delay: config.error_delay,
                interval: config.interval,
                user_agent: config.user_agent.clone().filter(|ua| !ua.is_empty()),
                registry,
                http,
                logger: config.logger.clone(),
                switch: config.switch.clone(),
                started: AtomicBool::new(false),
            }),
        })
    }

    /// Create a client from [`SurveyConfig::default`] and
    /// [`Registry::with_defaults`].
    pub fn with_defaults() -> Result<Self, ClientError> {
        Self::new(&SurveyConfig::default(), Arc::new(Registry::with_defaults()))
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }
}

impl std::fmt::Debug for SurveyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurveyClient")
            .field("url", &self.inner.url.as_str())
            .field("start_delay", &self.inner.start_delay)
            .field("error_delay", &self.inner.error_delay)
            .field("interval", &self.inner.interval)
            .field("started", &self.inner.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl SurveyClient {
    /// Launch the run loop on the current Tokio runtime and return at once.
    ///
    /// Submissions happen in the background; failures only reach the
    /// configured logger. The returned handle completes when the loop ends.
    ///
    /// # Errors
    /// Returns `ClientError::AlreadyStarted` if the client was started or run
    /// before.
    pub fn start(&self, cancel: CancellationToken) -> Result<JoinHandle<()>, ClientError> {
        self.mark_started()?;
        let client = self.clone();
        Ok(tokio::spawn(async move { client.run_loop(cancel).await }))
    }

    /// Drive the submission loop on the current task until it finishes or
    /// `cancel` fires.
    ///
    /// # Errors
    /// Returns `ClientError::AlreadyStarted` if the client was started or run
    /// before.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ClientError> {
        self.mark_started()?;
        self.run_loop(cancel).await;
        Ok(())
    }

    fn mark_started(&self) -> Result<(), ClientError> {
        self.inner
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ClientError::AlreadyStarted)
    }

    async fn run_loop(&self, cancel: CancellationToken) {
        let inner = &self.inner;
        tracing::info!(
            url = %inner.url,
            start_delay = ?inner.start_delay,
            interval = ?inner.interval,
            error_delay = ?inner.error_delay,
            "Survey client started"
        );

        if !inner.start_delay.is_zero() && !wait(&cancel, inner.start_delay).await {
            tracing::info!("Survey client cancelled during start delay");
            return;
        }

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Survey client cancelled during submission");
                    return;
                }
                result = self.submit() => result,
            };

            if let Err(e) = &result {
                self.report_failure(e);
            }

            let next = self.next_wait(&result);
            if next.is_zero() {
                tracing::info!("Survey client finished");
                return;
            }
            tracing::debug!(wait = ?next, "Waiting for next submission");
            if !wait(&cancel, next).await {
                tracing::info!("Survey client cancelled");
                return;
            }
        }
    }

    /// Perform one submission attempt.
    ///
    /// Does nothing while the submission switch is off. A non-success HTTP
    /// status counts as failure.
    pub async fn submit(&self) -> Result<(), SubmitError> {
        let inner = &self.inner;
        if !inner.switch.is_enabled() {
            tracing::debug!("Survey submission disabled, skipping");
            return Ok(());
        }

        let stats = inner.registry.gather().await?;
        let body = Payload::new(&stats).to_json()?;

        let mut request = inner
            .http
            .post(inner.url.clone())
            .header(STATS_REQUEST_HEADER, "1")
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(user_agent) = &inner.user_agent {
            request = request.header(USER_AGENT, user_agent.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        // Drain so the connection is released before returning.
        if let Err(e) = response.bytes().await {
            tracing::debug!(error = %e, "Failed to read survey response body");
        }
        if !status.is_success() {
            return Err(SubmitError::Status(status));
        }

        tracing::debug!(url = %inner.url, metrics = stats.len(), %status, "Survey submitted");
        Ok(())
    }

    /// Wait before the next attempt; zero ends the loop.
    fn next_wait(&self, result: &Result<(), SubmitError>) -> Duration {
        match result {
            Err(_) if !self.inner.error_delay.is_zero() => self.inner.error_delay,
            _ => self.inner.interval,
        }
    }

    fn report_failure(&self, error: &SubmitError) {
        tracing::debug!(error = %error, "Survey submission failed");
        if let Some(logger) = &self.inner.logger {
            logger.log(&format!("survey client failed: {error}"));
        }
    }
}

/// Build and start a survey client in one step.
///
/// `None` selects [`SurveyConfig::default`] and
/// [`Registry::with_defaults`] respectively.
pub fn start_survey_client(
    config: Option<&SurveyConfig>,
    registry: Option<Arc<Registry>>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>, ClientError> {
    let default_config;
    let config = match config {
        Some(config) => config,
        None => {
            default_config = SurveyConfig::default();
            &default_config
        }
    };
    let registry = registry.unwrap_or_else(|| Arc::new(Registry::with_defaults()));
    SurveyClient::new(config, registry)?.start(cancel)
}

/// Transport with fresh connections per request.
fn build_transport(insecure: bool) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(0)
        .tcp_keepalive(None::<Duration>)
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(ClientError::HttpClient)
}

/// Sleep for `duration`; `false` if cancelled first.
async fn wait(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
