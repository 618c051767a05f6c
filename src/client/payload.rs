//! Wire envelope of a submission.

use serde::Serialize;

use crate::metric::MetricSet;

/// Protocol version carried in every payload.
pub const PAYLOAD_VERSION: u32 = 2;

/// Submission body: `{"version": 2, "stats": {...}}`.
#[derive(Debug, Serialize)]
pub struct Payload<'a> {
    pub version: u32,
    pub stats: &'a MetricSet,
}

impl<'a> Payload<'a> {
    pub fn new(stats: &'a MetricSet) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            stats,
        }
    }

    /// Encode as indented JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}
