//! Constant metrics.

use crate::collector::{Collector, MetricSender};

use super::{Fields, Metric, MetricData, MetricError};

/// A metric holding a precomputed name and field set.
///
/// `ConstMap` is also a [`Collector`] that emits itself, so a fixed fact can
/// be registered directly with a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstMap {
    name: String,
    fields: Fields,
}

impl ConstMap {
    /// Create a constant metric.
    ///
    /// # Errors
    /// Returns [`MetricError::EmptyName`] for an empty name and
    /// [`MetricError::NonFiniteField`] for NaN or infinite float fields.
    pub fn new(name: impl Into<String>, fields: Fields) -> Result<Self, MetricError> {
        let name = name.into();
        if name.is_empty() {
            return Err(MetricError::EmptyName);
        }
        if let Some((field, _)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(MetricError::NonFiniteField {
                name,
                field: field.clone(),
            });
        }
        Ok(Self { name, fields })
    }

    /// Create a constant metric, panicking on invalid input.
    ///
    /// Intended for literal names and fields known to be valid.
    pub fn must_new(name: impl Into<String>, fields: Fields) -> Self {
        match Self::new(name, fields) {
            Ok(metric) => metric,
            Err(e) => panic!("invalid constant metric: {e}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}

impl Metric for ConstMap {
    fn write(&self, data: &mut MetricData) -> Result<(), MetricError> {
        data.name.clone_from(&self.name);
        data.fields.clone_from(&self.fields);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Collector for ConstMap {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, tx: MetricSender) {
        tx.send(self.clone()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::metric::FieldValue;

    #[test]
    fn test_const_map_write_copies_fields() {
        let metric = ConstMap::new("users", fields! { "type" => "int", "value" => 12u64 }).unwrap();

        let mut data = MetricData::default();
        metric.write(&mut data).unwrap();

        assert_eq!(data.name, "users");
        assert_eq!(data.fields["value"], FieldValue::Uint(12));
        assert_eq!(data.fields.len(), 2);
    }

    #[test]
    fn test_const_map_rejects_empty_name() {
        let result = ConstMap::new("", fields! { "value" => 1 });
        assert_eq!(result.unwrap_err(), MetricError::EmptyName);
    }

    #[test]
    fn test_const_map_rejects_non_finite() {
        let err = ConstMap::new("ratio", fields! { "value" => f64::NAN }).unwrap_err();
        assert!(err.to_string().contains("'value'"));
    }

    #[test]
    #[should_panic(expected = "invalid constant metric")]
    fn test_const_map_must_new_panics() {
        ConstMap::must_new("", Fields::new());
    }

    #[tokio::test]
    async fn test_const_map_collects_itself() {
        let metric = ConstMap::must_new("answer", fields! { "value" => 42 });
        let (tx, mut rx) = MetricSender::channel(1);

        metric.collect(tx).await;

        let received = rx.recv().await.unwrap();
        let mut data = MetricData::default();
        received.write(&mut data).unwrap();
        assert_eq!(data.name, "answer");
        assert!(rx.recv().await.is_none());
    }
}
