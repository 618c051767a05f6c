//! Survey client error types.
//!
//! [`ClientError`] is returned to the host when constructing or starting a
//! client. [`SubmitError`] describes a failed attempt; the run loop only
//! logs it.

use reqwest::StatusCode;
use thiserror::Error;

use crate::collector::RegistryError;
use crate::config::ConfigError;

/// Errors raised while constructing or starting a survey client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid or inconsistent configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP transport could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// `start` was already called on this client.
    #[error("survey client already started")]
    AlreadyStarted,
}

/// Errors of a single submission attempt.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Gathering metrics failed.
    #[error("gather failed: {0}")]
    Gather(#[from] RegistryError),

    /// The payload could not be encoded.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The request could not be sent or the response not received.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("unexpected response status: {0}")]
    Status(StatusCode),
}
