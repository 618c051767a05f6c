//! Failure reporting sink for the survey client.

/// Receives the survey client's failure messages.
///
/// Submission failures are never returned to the host application; a
/// `Logger` is the only place they surface.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

/// Default [`Logger`] forwarding messages to `tracing` at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::warn!(target: "survey_client", "{}", message);
    }
}
