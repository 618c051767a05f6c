//! Survey Client - Periodic Statistics Submission
//!
//! This crate gathers small key/value facts from pluggable collectors,
//! assembles them into one payload and submits it to a remote collection
//! endpoint on a timer. It can be embedded as a library, or run as the
//! standalone `survey-client` binary.
//!
//! # Architecture
//!
//! - **Metrics**: Named field maps produced by collectors ([`metric`])
//! - **Collectors**: Pluggable producers and the concurrent gather pass ([`collector`])
//! - **Client**: Timed submission loop with start delay, interval and error backoff ([`client`])
//! - **Configuration**: Defaults, environment overrides and YAML loading ([`config`])
//! - **Utilities**: Atomic counters ([`counter`]) and identifier hashing ([`guid`])
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use survey_client::{ProgramCollector, Registry, SurveyClient, SurveyConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(Registry::with_defaults());
//!     registry.register(ProgramCollector::new("demo", "1.0.0", None))?;
//!
//!     let client = SurveyClient::new(&SurveyConfig::from_env()?, registry)?;
//!     let cancel = CancellationToken::new();
//!     let handle = client.start(cancel.clone())?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     cancel.cancel();
//!     handle.await?;
//!     Ok(())
//! }
//! ```

pub mod autosurvey;
pub mod client;
pub mod collector;
pub mod config;
pub mod counter;
pub mod guid;
pub mod logger;
pub mod metric;

pub use autosurvey::{AutoSurvey, AutoSurveyError};
pub use client::{ClientError, SubmitError, SurveyClient, start_survey_client};
pub use collector::{BasicCollector, Collector, MetricSender, ProgramCollector, Registry, RegistryError};
pub use config::{ConfigError, SubmissionSwitch, SurveyConfig};
pub use guid::{HashVersion, hash_guid_v1};
pub use logger::{Logger, TracingLogger};
pub use metric::{ConstMap, FieldValue, Fields, Metric, MetricData, MetricError, MetricSet};
