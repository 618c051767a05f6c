//! Collector registry and the concurrent gather pass.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use thiserror::Error;
use tokio::task::JoinSet;

use crate::collector::{BasicCollector, Collector, MetricSender};
use crate::metric::{MetricData, MetricSet};

/// Upper bound on concurrently running collect workers per gather pass.
pub const MAX_GATHER_WORKERS: usize = 8;

type PendingQueue = Arc<Mutex<VecDeque<Arc<dyn Collector>>>>;

/// Errors that can occur in the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The task coordinating the gather workers failed.
    #[error("gather task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Not every registered collector returned from `collect`.
    #[error("gather incomplete: {0} collector(s) unaccounted for")]
    Incomplete(usize),
}

/// Registry holding the collectors of one survey client.
///
/// Registration appends to an ordered list. [`gather`](Self::gather) takes a
/// snapshot of that list, so registering while a gather is in flight is safe
/// but only affects the next pass.
#[derive(Default)]
pub struct Registry {
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in [`BasicCollector`] registered.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.must_register([Arc::new(BasicCollector::new()) as Arc<dyn Collector>]);
        registry
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("collector_count", &self.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Register a collector.
    ///
    /// Appending is the only effect; the `Result` leaves room for validation.
    pub fn register<C: Collector>(&self, collector: C) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(collector))
    }

    /// Register a shared collector.
    pub fn register_arc(&self, collector: Arc<dyn Collector>) -> Result<(), RegistryError> {
        tracing::debug!(collector = %collector.name(), "Collector registered");
        self.collectors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(collector);
        Ok(())
    }

    /// Register all `collectors`, panicking if any registration fails.
    pub fn must_register<I>(&self, collectors: I)
    where
        I: IntoIterator<Item = Arc<dyn Collector>>,
    {
        for collector in collectors {
            let name = collector.name().to_owned();
            if let Err(e) = self.register_arc(collector) {
                panic!("failed to register collector '{name}': {e}");
            }
        }
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every registered collector and gather their metrics.
    ///
    /// Collectors are pulled from a shared queue by a pool of at most
    /// [`MAX_GATHER_WORKERS`] tasks, so each one runs exactly once. The
    /// metric channel closes after the last collector returns. Metrics whose
    /// [`write`](crate::metric::Metric::write) fails, or which come out
    /// unnamed, are dropped.
    ///
    /// An empty registry yields an empty set.
    ///
    /// # Panics
    /// A panic inside a collector is re-raised here once all other workers
    /// have finished.
    pub async fn gather(&self) -> Result<MetricSet, RegistryError> {
        let collectors: VecDeque<_> = self
            .collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        let total = collectors.len();
        if total == 0 {
            return Ok(MetricSet::new());
        }

        let pending: PendingQueue = Arc::new(Mutex::new(collectors));
        let (tx, mut rx) = MetricSender::channel(total);

        let mut workers = JoinSet::new();
        for _ in 0..total.min(MAX_GATHER_WORKERS) {
            workers.spawn(collect_worker(Arc::clone(&pending), tx.clone()));
        }

        // Holds the last sender until every worker is joined.
        let closer = tokio::spawn(async move {
            let mut remaining = total;
            let mut panic = None;
            while let Some(result) = workers.join_next().await {
                match result {
                    Ok(done) => remaining = remaining.saturating_sub(done),
                    Err(e) if e.is_panic() => {
                        panic.get_or_insert(e.into_panic());
                    }
                    Err(e) => tracing::warn!(error = %e, "Gather worker cancelled"),
                }
            }
            drop(tx);
            (remaining, panic)
        });

        let mut stats = MetricSet::new();
        let mut dropped = 0usize;
        while let Some(metric) = rx.recv().await {
            let mut data = MetricData::default();
            match metric.write(&mut data) {
                Ok(()) if !data.name.is_empty() => stats.push(data),
                Ok(()) => {
                    dropped += 1;
                    tracing::debug!("Dropping metric without name");
                }
                Err(e) => {
                    dropped += 1;
                    tracing::debug!(error = %e, "Dropping metric");
                }
            }
        }

        let (remaining, panic) = closer.await?;
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
        if remaining > 0 {
            return Err(RegistryError::Incomplete(remaining));
        }

        tracing::debug!(
            collectors = total,
            metrics = stats.len(),
            dropped,
            "Gather complete"
        );
        Ok(stats)
    }
}

/// Pull collectors off the queue until it is empty, returning how many ran.
async fn collect_worker(pending: PendingQueue, tx: MetricSender) -> usize {
    let mut done = 0;
    loop {
        let next = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(collector) = next else {
            break;
        };
        tracing::trace!(collector = %collector.name(), "Running collector");
        collector.collect(tx.clone()).await;
        done += 1;
    }
    done
}
