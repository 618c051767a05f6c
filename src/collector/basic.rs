//! Built-in collector for basic machine facts.

use std::path::{Path, PathBuf};

use crate::collector::{Collector, MetricSender};
use crate::fields;
use crate::metric::ConstMap;

/// Collects the machine id, kernel identification and OS release name.
///
/// Emits `machine_id`, `utsname` and `osrelease`. Sources that cannot be
/// read produce empty values rather than missing metrics. `utsname` always
/// comes from the running kernel; the root only affects file lookups.
#[derive(Debug, Clone)]
pub struct BasicCollector {
    root: PathBuf,
}

impl Default for BasicCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicCollector {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Read system files relative to `root` instead of `/`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    async fn machine_id(&self) -> String {
        first_line(&self.path("etc/machine-id"))
            .await
            .unwrap_or_default()
    }

    async fn osrelease(&self) -> String {
        if let Ok(content) = tokio::fs::read_to_string(self.path("etc/os-release")).await {
            return pretty_name(&content).unwrap_or_default();
        }
        first_line(&self.path("etc/redhat-release"))
            .await
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Collector for BasicCollector {
    fn name(&self) -> &str {
        "basic"
    }

    async fn collect(&self, tx: MetricSender) {
        let metrics = [
            ("machine_id", "", self.machine_id().await),
            ("utsname", "Pretty platform name", platform_name()),
            (
                "osrelease",
                "Pretty operating system name",
                self.osrelease().await,
            ),
        ];
        for (name, desc, value) in metrics {
            let metric = ConstMap::must_new(
                name,
                fields! { "desc" => desc, "type" => "string", "value" => value },
            );
            if !tx.send(metric).await {
                return;
            }
        }
    }
}

async fn first_line(path: &Path) -> Option<String> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    content.lines().next().map(|line| line.trim().to_string())
}

/// `<sysname> <machine> <release>` as reported by `uname(2)`.
#[cfg(unix)]
fn platform_name() -> String {
    match nix::sys::utsname::uname() {
        Ok(uts) => format!(
            "{} {} {}",
            uts.sysname().to_string_lossy(),
            uts.machine().to_string_lossy(),
            uts.release().to_string_lossy(),
        ),
        Err(e) => {
            tracing::debug!(error = %e, "uname failed");
            String::new()
        }
    }
}

#[cfg(not(unix))]
fn platform_name() -> String {
    String::new()
}

/// Extract `PRETTY_NAME` from os-release content.
fn pretty_name(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|value| value.trim_matches(|c: char| c == '"' || c.is_whitespace()).to_string())
}
