//! Submission Client
//!
//! Periodically gathers a [`Registry`](crate::collector::Registry) and POSTs
//! the result as JSON to a collection endpoint.
//!
//! # Schedule
//!
//! ```text
//! start ──start_delay──► submit ──interval────► submit ──► ...
//!                          │
//!                          └─failure──error_delay──► submit
//! ```
//!
//! A zero wait ends the loop ("run once"). Cancellation is honoured at every
//! wait and during an attempt; no attempt starts after it fires.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use survey_client::{Registry, SurveyClient, SurveyConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SurveyConfig::from_env()?;
//! let client = SurveyClient::new(&config, Arc::new(Registry::with_defaults()))?;
//! let cancel = CancellationToken::new();
//! client.start(cancel.clone())?;
//! // ... on shutdown
//! cancel.cancel();
//! # Ok(())
//! # }
//! ```

mod error;
mod payload;
mod survey;

pub use error::{ClientError, SubmitError};
pub use payload::{PAYLOAD_VERSION, Payload};
pub use survey::{
    CONNECT_TIMEOUT, REQUEST_TIMEOUT, STATS_REQUEST_HEADER, SurveyClient, start_survey_client,
};
