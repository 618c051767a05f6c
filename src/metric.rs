//! Metric Model
//!
//! A metric is the smallest unit of survey data: a name plus an unordered map
//! of scalar fields. Collectors emit [`Metric`]s, the registry turns each one
//! into a [`MetricData`] record via [`Metric::write`], and the records of one
//! gather pass form a [`MetricSet`].
//!
//! # Wire shape
//!
//! A [`MetricSet`] serializes to a JSON object keyed by metric name:
//!
//! ```json
//! { "osrelease": { "desc": "Pretty operating system name", "type": "string", "value": "Debian GNU/Linux 12" } }
//! ```

mod const_map;
mod value;

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

pub use const_map::ConstMap;
pub use value::{FieldValue, Fields};

/// Errors raised while building or writing a metric.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricError {
    /// Metric names must be non-empty.
    #[error("metric name is empty")]
    EmptyName,

    /// Float fields must be finite to be representable in JSON.
    #[error("field '{field}' of metric '{name}' is not a finite number")]
    NonFiniteField { name: String, field: String },

    /// The metric source could not produce a value.
    #[error("metric write failed: {0}")]
    Write(String),
}

/// A single collected record: the metric name and its fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricData {
    /// Metric name, used as the key in the submitted payload.
    pub name: String,
    /// Field values (description, type tag, value, ...).
    pub fields: Fields,
}

/// Anything that can be recorded as survey data.
///
/// Metrics are immutable once created; `write` may be called from any task.
pub trait Metric: Send + Sync + 'static {
    /// Encode this metric into `data`.
    ///
    /// # Errors
    /// Returns [`MetricError`] when the metric cannot be represented. The
    /// registry drops such metrics without failing the whole gather.
    fn write(&self, data: &mut MetricData) -> Result<(), MetricError>;
}

/// Type-erased metric as carried on the gather channel.
pub type BoxedMetric = Box<dyn Metric>;

/// Result of one gather pass.
///
/// Order follows arrival on the fan-in channel and is not stable across
/// passes. Serialization collapses duplicate names, the last record wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    content: Vec<MetricData>,
}

impl MetricSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, data: MetricData) {
        self.content.push(data);
    }

    /// Number of records, duplicates included.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Iterate records in arrival order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MetricData> + ExactSizeIterator {
        self.content.iter()
    }

    /// Look up the fields recorded last under `name`.
    pub fn get(&self, name: &str) -> Option<&Fields> {
        self.content
            .iter()
            .rev()
            .find(|data| data.name == name)
            .map(|data| &data.fields)
    }

    /// Name-keyed view as it goes on the wire.
    pub fn to_map(&self) -> BTreeMap<&str, &Fields> {
        self.content
            .iter()
            .map(|data| (data.name.as_str(), &data.fields))
            .collect()
    }

    pub fn into_inner(self) -> Vec<MetricData> {
        self.content
    }
}

impl FromIterator<MetricData> for MetricSet {
    fn from_iter<I: IntoIterator<Item = MetricData>>(iter: I) -> Self {
        Self {
            content: iter.into_iter().collect(),
        }
    }
}

impl Serialize for MetricSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let stats = self.to_map();
        let mut map = serializer.serialize_map(Some(stats.len()))?;
        for (name, fields) in stats {
            map.serialize_entry(name, fields)?;
        }
        map.end()
    }
}
