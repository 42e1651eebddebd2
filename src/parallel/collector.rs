//! Draining the result channel of a batch

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::error::{Stage, ThumbnailError};
use crate::parallel::signal::{Completion, Outcome};

/// Consumes completion signals until the waiter closes the channel
pub struct Collector {
    receiver: UnboundedReceiver<Completion>,
    dispatched: usize,
}

impl Collector {
    pub fn new(receiver: UnboundedReceiver<Completion>, dispatched: usize) -> Self {
        Self {
            receiver,
            dispatched,
        }
    }

    /// Drain every signal, calling `observer` on each before it is recorded
    pub async fn drain<F>(mut self, mut observer: F) -> BatchReport
    where
        F: FnMut(&Completion),
    {
        let mut report = BatchReport {
            dispatched: self.dispatched,
            ..BatchReport::default()
        };

        while let Some(completion) = self.receiver.recv().await {
            observer(&completion);
            report.record(completion);
        }

        if !report.is_complete() {
            error!(
                "Result channel closed after {} of {} signals",
                report.received, report.dispatched
            );
        }

        report
    }
}

/// Outcome of one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Items handed to workers
    pub dispatched: usize,
    /// Completion signals drained from the channel
    pub received: usize,
    /// Thumbnails written, in completion order
    pub thumbnails: Vec<PathBuf>,
    /// Per-item failures, in completion order
    pub failures: Vec<ThumbnailError>,
    /// Wall-clock time from dispatch to channel close
    pub duration: Duration,
}

impl BatchReport {
    fn record(&mut self, completion: Completion) {
        self.received += 1;
        match completion.outcome {
            Outcome::Thumbnail(path) => {
                info!("New thumb file: {}", path.display());
                self.thumbnails.push(path);
            }
            Outcome::Failed(err) => {
                warn!("Thumb err: {}", err);
                self.failures.push(err);
            }
        }
    }

    /// Every dispatched item produced exactly one signal
    pub fn is_complete(&self) -> bool {
        self.received == self.dispatched
    }

    pub fn succeeded(&self) -> usize {
        self.thumbnails.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Failures raised by the given pipeline stage
    pub fn failures_at(&self, stage: Stage) -> impl Iterator<Item = &ThumbnailError> {
        self.failures
            .iter()
            .filter(move |err| err.stage() == Some(stage))
    }

    /// Serializable view for machine-readable output
    pub fn summary(&self) -> BatchSummary {
        let mut thumbnails: Vec<String> = self
            .thumbnails
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        thumbnails.sort();

        let mut failures: Vec<FailureSummary> = self
            .failures
            .iter()
            .map(|err| FailureSummary {
                item: err
                    .item()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                stage: err.stage(),
                message: err.to_string(),
            })
            .collect();
        failures.sort_by(|a, b| a.item.cmp(&b.item));

        BatchSummary {
            dispatched: self.dispatched,
            succeeded: self.succeeded(),
            failed: self.failed(),
            duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
            thumbnails,
            failures,
        }
    }
}

/// JSON-friendly batch summary, sorted by path
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub thumbnails: Vec<String>,
    pub failures: Vec<FailureSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub item: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub message: String,
}
