//! Core collector traits and types.

use std::fmt;

use tokio::sync::mpsc;

use crate::metric::{BoxedMetric, Metric};

/// Sending half of the gather fan-in channel.
///
/// Cloning is cheap; a collector may hand clones to sub-tasks. The channel
/// closes once every clone is dropped.
#[derive(Clone)]
pub struct MetricSender {
    tx: mpsc::Sender<BoxedMetric>,
}

impl MetricSender {
    /// Create a bounded metric channel.
    ///
    /// The registry builds one per gather pass; it is public so collectors
    /// can be exercised or nested outside of a registry.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<BoxedMetric>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Emit a metric.
    ///
    /// Returns `false` if the receiving side is gone, in which case the
    /// collector should stop emitting.
    pub async fn send(&self, metric: impl Metric) -> bool {
        self.send_boxed(Box::new(metric)).await
    }

    /// Emit an already boxed metric.
    pub async fn send_boxed(&self, metric: BoxedMetric) -> bool {
        self.tx.send(metric).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for MetricSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricSender")
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

/// Core collector trait for implementing metric producers.
///
/// # Contract
///
/// - `collect` may run concurrently with any other collector. Shared state
///   must be synchronized by the collector itself.
/// - `collect` must return. The registry enforces no timeout; a collector
///   that never returns stalls the gather pass. Wrap slow I/O in
///   [`tokio::time::timeout`] when bounded latency matters.
/// - A panic inside `collect` is a defect and aborts the gather pass.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Emit zero or more metrics into `tx`, then return.
    async fn collect(&self, tx: MetricSender);
}
