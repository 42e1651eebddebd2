//! Concurrent fan-out/fan-in of thumbnail work items

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, ThumbnailError};
use crate::processing::{discover_items, ThumbnailTransform, Transform};

pub mod barrier;
pub mod collector;
pub mod signal;
pub mod worker;

pub use barrier::*;
pub use collector::*;
pub use signal::*;
pub use worker::*;

/// Runs one worker per item and collects exactly one signal per item
pub struct BatchOrchestrator {
    transform: Arc<dyn Transform>,
    max_concurrency: Option<usize>,
    item_timeout: Option<Duration>,
}

impl BatchOrchestrator {
    /// Create an orchestrator with no concurrency cap and no deadline
    pub fn new(transform: Arc<dyn Transform>) -> Self {
        Self {
            transform,
            max_concurrency: None,
            item_timeout: None,
        }
    }

    /// Build the orchestrator and its image transform from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let transform = ThumbnailTransform::from_config(&config.thumbnail);
        Ok(Self::new(Arc::new(transform))
            .with_max_concurrency(config.processing.max_concurrency)
            .with_item_timeout(config.processing.item_timeout()))
    }

    /// Cap the number of items processed at once (None = no cap)
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Fail items that take longer than `timeout`
    pub fn with_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Process a batch and wait for every item to report
    pub async fn run<I>(&self, items: I) -> Result<BatchReport>
    where
        I: IntoIterator,
        I::Item: Into<WorkItem>,
    {
        self.run_with_observer(items, |_| {}).await
    }

    /// Thumbnail every eligible file of a directory
    pub async fn run_directory<P: AsRef<Path>>(&self, dir: P) -> Result<BatchReport> {
        let items = discover_items(dir)?;
        self.run(items).await
    }

    /// Process a batch, calling `observer` for each signal as it is collected
    ///
    /// Per-item failures end up in the report; the error is reserved for
    /// batches that could not be run at all.
    pub async fn run_with_observer<I, F>(&self, items: I, observer: F) -> Result<BatchReport>
    where
        I: IntoIterator,
        I::Item: Into<WorkItem>,
        F: FnMut(&Completion),
    {
        if self.max_concurrency == Some(0) {
            return Err(ThumbnailError::config(
                "Concurrency limit must be greater than 0",
            ));
        }

        let items: Vec<WorkItem> = items.into_iter().map(Into::into).collect();
        let total = items.len();
        let start_time = Instant::now();

        info!("Starting thumbnail batch of {} items", total);

        let (sender, receiver) = mpsc::unbounded_channel();
        let barrier = CompletionBarrier::new(total);

        // Guards take their sender clones before the waiter receives the original.
        let guards: Vec<CompletionGuard> = items
            .into_iter()
            .map(|item| CompletionGuard::new(item, sender.clone(), barrier.clone()))
            .collect();
        let waiter = Waiter::spawn(barrier, sender);

        let limiter = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        for guard in guards {
            let worker = Worker::new(guard, Arc::clone(&self.transform))
                .with_limiter(limiter.clone())
                .with_timeout(self.item_timeout);
            tokio::spawn(worker.run());
        }
        debug!("Dispatched {} workers", total);

        let mut report = Collector::new(receiver, total).drain(observer).await;

        waiter
            .await
            .map_err(|e| ThumbnailError::batch(format!("waiter task failed: {}", e)))?;

        report.duration = start_time.elapsed();
        info!(
            "Batch completed in {:.2}s: {} thumbnails, {} failures",
            report.duration.as_secs_f64(),
            report.succeeded(),
            report.failed()
        );

        Ok(report)
    }
}
