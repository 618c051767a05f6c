//! Configuration module for the survey client.
//!
//! Provides defaults, environment overrides and YAML loading for:
//! - Submission endpoint and TLS policy
//! - Start delay, steady-state interval and error delay
//! - Runtime collaborators (logger, HTTP client, submission switch)

mod survey;
mod validation;

pub use survey::{
    DEFAULT_ERROR_DELAY, DEFAULT_INTERVAL, DEFAULT_START_DELAY, DEFAULT_URL, ENV_AUTOSURVEY,
    ENV_ENABLED, ENV_ERROR_DELAY, ENV_HASH_GUID, ENV_INSECURE, ENV_INTERVAL, ENV_START_DELAY,
    ENV_URL, ENV_USER_AGENT, SubmissionSwitch, SurveyConfig, default_user_agent,
};
pub use validation::{ConfigError, is_switched_off, parse_duration, parse_seconds};
