//! Program identification collector.

use std::path::Path;

use crate::collector::{Collector, MetricSender};
use crate::fields;
use crate::metric::ConstMap;

/// Program name reported when none is known.
pub const DEFAULT_PROGRAM_NAME: &str = "unknown";

/// Program version reported when none is provided.
pub const DEFAULT_PROGRAM_VERSION: &str = "0.0.0-unknown";

/// Collects the name and version of the running program.
///
/// Emits `program_name`, `program_version` and, when a guid was supplied,
/// `program_guid`.
#[derive(Debug, Clone)]
pub struct ProgramCollector {
    name: String,
    version: String,
    guid: Option<String>,
}

impl ProgramCollector {
    /// Create a program collector.
    ///
    /// An empty `name` falls back to the executable's file name. Pass an
    /// already hashed guid; see [`HashVersion`](crate::guid::HashVersion).
    pub fn new(name: impl Into<String>, version: impl Into<String>, guid: Option<String>) -> Self {
        let mut name = name.into();
        if name.is_empty() {
            name = executable_name().unwrap_or_default();
        }
        Self {
            name,
            version: version.into(),
            guid: guid.filter(|g| !g.is_empty()),
        }
    }

    pub fn program_name(&self) -> &str {
        if self.name.is_empty() {
            DEFAULT_PROGRAM_NAME
        } else {
            &self.name
        }
    }

    pub fn program_version(&self) -> &str {
        if self.version.is_empty() {
            DEFAULT_PROGRAM_VERSION
        } else {
            &self.version
        }
    }
}

#[async_trait::async_trait]
impl Collector for ProgramCollector {
    fn name(&self) -> &str {
        "program"
    }

    async fn collect(&self, tx: MetricSender) {
        let mut metrics = vec![
            ConstMap::must_new(
                "program_name",
                fields! { "desc" => "Program name", "type" => "string", "value" => self.program_name() },
            ),
            ConstMap::must_new(
                "program_version",
                fields! { "desc" => "Program version", "type" => "string", "value" => self.program_version() },
            ),
        ];
        if let Some(guid) = &self.guid {
            metrics.push(ConstMap::must_new(
                "program_guid",
                fields! { "desc" => "Installation identifier", "type" => "string", "value" => guid.as_str() },
            ));
        }
        for metric in metrics {
            if !tx.send(metric).await {
                return;
            }
        }
    }
}

fn executable_name() -> Option<String> {
    let arg0 = std::env::args_os().next()?;
    Path::new(&arg0)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
