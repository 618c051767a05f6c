//! Prometheus collector adapter.
//!
//! Re-exposes [`prometheus::core::Collector`]s as survey collectors. Names,
//! help texts and values are read through the public
//! [`MetricFamily`](prometheus::proto::MetricFamily) accessors.
//!
//! # Whitelist
//!
//! Without a whitelist every counter and gauge is forwarded under its own
//! name. With a whitelist only listed names are forwarded; a non-empty value
//! renames the metric and may override mode and type using the format
//! `alias,mode:type`:
//!
//! ```text
//! rtm_distinct_users_connected_max => usercnt_active,gauge:int
//! rtm_channels_created_max         => usercnt_equipment
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use prometheus::proto::{MetricFamily, MetricType};

use crate::collector::{Collector, MetricSender, Registry, RegistryError};
use crate::fields;
use crate::metric::{ConstMap, Metric, MetricData, MetricError};

/// Whitelist mapping Prometheus names to `alias,mode:type` specs.
pub type Whitelist = HashMap<String, String>;

/// A survey collector wrapping a Prometheus collector.
pub struct PrometheusCollector {
    inner: Box<dyn prometheus::core::Collector>,
    whitelist: Option<Whitelist>,
}

impl PrometheusCollector {
    /// Wrap `collector`, forwarding everything when `whitelist` is `None`.
    pub fn new(collector: Box<dyn prometheus::core::Collector>, whitelist: Option<Whitelist>) -> Self {
        Self {
            inner: collector,
            whitelist,
        }
    }

    fn convert(&self, family: &MetricFamily) -> Vec<PrometheusMetric> {
        let Some(target) = Target::resolve(family.get_name(), self.whitelist.as_ref()) else {
            return Vec::new();
        };
        family
            .get_metric()
            .iter()
            .filter_map(|metric| {
                let (mode, value) = match family.get_field_type() {
                    MetricType::COUNTER => ("counter", metric.get_counter().get_value()),
                    MetricType::GAUGE => ("gauge", metric.get_gauge().get_value()),
                    _ => return None,
                };
                Some(PrometheusMetric {
                    name: target.name.clone(),
                    help: family.get_help().to_string(),
                    mode: target.mode.clone().unwrap_or_else(|| mode.to_string()),
                    mtype: target.mtype.clone().unwrap_or_else(|| "float".to_string()),
                    value,
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for PrometheusCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusCollector")
            .field("whitelist", &self.whitelist)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Collector for PrometheusCollector {
    fn name(&self) -> &str {
        "prometheus"
    }

    async fn collect(&self, tx: MetricSender) {
        let metrics: Vec<PrometheusMetric> = self
            .inner
            .collect()
            .iter()
            .flat_map(|family| self.convert(family))
            .collect();
        for metric in metrics {
            if !tx.send(metric).await {
                return;
            }
        }
    }
}

/// Output name and overrides for one Prometheus metric family.
#[derive(Debug, Clone, PartialEq)]
struct Target {
    name: String,
    mode: Option<String>,
    mtype: Option<String>,
}

impl Target {
    /// Apply the whitelist to `name`. `None` means the family is filtered out.
    fn resolve(name: &str, whitelist: Option<&Whitelist>) -> Option<Self> {
        let plain = Self {
            name: name.to_string(),
            mode: None,
            mtype: None,
        };
        let Some(whitelist) = whitelist else {
            return Some(plain);
        };
        let spec = whitelist.get(name)?;
        if spec.is_empty() {
            return Some(plain);
        }

        let (alias, format) = match spec.split_once(',') {
            Some((alias, format)) => (alias, Some(format)),
            None => (spec.as_str(), None),
        };
        let (mode, mtype) = match format.map(|f| f.split_once(':').unwrap_or((f, ""))) {
            Some((mode, mtype)) => (non_empty(mode), non_empty(mtype)),
            None => (None, None),
        };
        Some(Self {
            name: alias.to_string(),
            mode,
            mtype,
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// A converted Prometheus sample, validated when written.
#[derive(Debug, Clone)]
struct PrometheusMetric {
    name: String,
    help: String,
    mode: String,
    mtype: String,
    value: f64,
}

impl Metric for PrometheusMetric {
    fn write(&self, data: &mut MetricData) -> Result<(), MetricError> {
        ConstMap::new(
            self.name.as_str(),
            fields! {
                "desc" => self.help.as_str(),
                "mode" => self.mode.as_str(),
                "type" => self.mtype.as_str(),
                "value" => self.value,
            },
        )?
        .write(data)
    }
}

/// Registers Prometheus collectors into a survey [`Registry`].
#[derive(Debug, Clone)]
pub struct PrometheusRegisterer {
    registry: Arc<Registry>,
    whitelist: Option<Whitelist>,
}

impl PrometheusRegisterer {
    pub fn new(registry: Arc<Registry>, whitelist: Option<Whitelist>) -> Self {
        Self {
            registry,
            whitelist,
        }
    }

    /// Wrap and register a Prometheus collector.
    pub fn register(&self, collector: Box<dyn prometheus::core::Collector>) -> Result<(), RegistryError> {
        self.registry
            .register(PrometheusCollector::new(collector, self.whitelist.clone()))
    }

    /// Register all `collectors`, panicking if any registration fails.
    pub fn must_register(&self, collectors: Vec<Box<dyn prometheus::core::Collector>>) {
        for collector in collectors {
            if let Err(e) = self.register(collector) {
                panic!("failed to register prometheus collector: {e}");
            }
        }
    }

    /// Unregistering is not supported; always returns `false`.
    pub fn unregister(&self, _collector: &dyn prometheus::core::Collector) -> bool {
        false
    }
}
