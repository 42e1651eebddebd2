//! Per-item worker: open, transform, write, signal

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Result, Stage, ThumbnailError};
use crate::parallel::barrier::CompletionGuard;
use crate::parallel::signal::{Outcome, WorkItem};
use crate::processing::Transform;

/// Runs the thumbnail pipeline for exactly one work item
pub struct Worker {
    guard: CompletionGuard,
    transform: Arc<dyn Transform>,
    limiter: Option<Arc<Semaphore>>,
    timeout: Option<Duration>,
}

impl Worker {
    pub fn new(guard: CompletionGuard, transform: Arc<dyn Transform>) -> Self {
        Self {
            guard,
            transform,
            limiter: None,
            timeout: None,
        }
    }

    /// Share a concurrency limiter with the other workers of the batch
    pub fn with_limiter(mut self, limiter: Option<Arc<Semaphore>>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Fail the item if processing takes longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Process the item and emit its completion signal
    ///
    /// Never returns an error: every outcome, including a crash inside the
    /// transform, is reported through the guard.
    pub async fn run(self) {
        let Self {
            guard,
            transform,
            limiter,
            timeout,
        } = self;

        let item = guard.item().clone();
        let result = execute(&item, transform, limiter, timeout).await;

        let outcome = match result {
            Ok(destination) => Outcome::Thumbnail(destination),
            Err(e) => {
                debug!("Failed to process {}: {}", item, e);
                Outcome::Failed(e)
            }
        };
        guard.signal(outcome);
    }
}

async fn execute(
    item: &WorkItem,
    transform: Arc<dyn Transform>,
    limiter: Option<Arc<Semaphore>>,
    timeout: Option<Duration>,
) -> Result<PathBuf> {
    // Held until the item is done.
    let _permit = match limiter {
        Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(|e| {
            ThumbnailError::panicked(item.path(), format!("concurrency limiter closed: {}", e))
        })?),
        None => None,
    };

    let deadline = timeout.map(|limit| (Instant::now() + limit, limit));

    let encoded = match deadline {
        Some((at, limit)) => match tokio::time::timeout_at(at, render(item, transform)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Timed out after {:?} processing {}", limit, item);
                return Err(ThumbnailError::timeout(item.path(), limit));
            }
        },
        None => render(item, transform).await?,
    };

    persist(item, encoded, deadline).await
}

/// open -> read -> decode/resize/encode
async fn render(item: &WorkItem, transform: Arc<dyn Transform>) -> Result<Vec<u8>> {
    let source = item.path();

    debug!("Opening image file {:?}", source);
    let data = read_source(source).await?;
    debug!("Read {} bytes from {:?}", data.len(), source);

    tokio::task::spawn_blocking(move || transform.transform(&data))
        .await
        .map_err(|e| ThumbnailError::panicked(source, format!("transform task failed: {}", e)))?
        .map_err(|e| e.for_item(source))
}

/// create -> write -> close, as one blocking step
///
/// A deadline never interrupts the write halfway: on expiry the write is
/// awaited and its output removed before the timeout is reported.
async fn persist(
    item: &WorkItem,
    encoded: Vec<u8>,
    deadline: Option<(Instant, Duration)>,
) -> Result<PathBuf> {
    let source = item.path().to_path_buf();
    let destination = item.destination();

    let mut write = {
        let source = source.clone();
        let destination = destination.clone();
        tokio::task::spawn_blocking(move || write_thumbnail(&source, &destination, &encoded))
    };

    let joined = match deadline {
        Some((at, limit)) => match tokio::time::timeout_at(at, &mut write).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!("Timed out after {:?} writing {:?}", limit, destination);
                let _ = write.await;
                discard_partial(&destination).await;
                return Err(ThumbnailError::timeout(source, limit));
            }
        },
        None => write.await,
    };

    let result = joined
        .map_err(|e| ThumbnailError::panicked(&source, format!("write task failed: {}", e)))
        .and_then(|written| written);

    match result {
        Ok(()) => {
            debug!("Wrote thumbnail {:?}", destination);
            Ok(destination)
        }
        Err(e) => {
            if matches!(e.stage(), Some(Stage::Encode | Stage::Close)) {
                discard_partial(&destination).await;
            }
            Err(e)
        }
    }
}

async fn read_source(source: &Path) -> Result<Vec<u8>> {
    let mut file = fs::File::open(source)
        .await
        .map_err(|e| ThumbnailError::open(source, e))?;

    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .await
        .map_err(|e| ThumbnailError::open(source, e))?;

    Ok(data)
}

fn write_thumbnail(source: &Path, destination: &Path, encoded: &[u8]) -> Result<()> {
    let mut output =
        std::fs::File::create(destination).map_err(|e| ThumbnailError::create(source, e))?;
    debug!("Created thumb file {:?}", destination);

    output
        .write_all(encoded)
        .map_err(|e| ThumbnailError::encode(source, image::ImageError::IoError(e)))?;

    output
        .flush()
        .map_err(|e| ThumbnailError::close(source, e))?;
    output
        .sync_all()
        .map_err(|e| ThumbnailError::close(source, e))?;

    Ok(())
}

/// Remove a half-written thumbnail so no output is left in an unknown state
async fn discard_partial(destination: &Path) {
    match fs::remove_file(destination).await {
        Ok(()) => debug!("Removed partial thumbnail {:?}", destination),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial thumbnail {:?}: {}", destination, e),
    }
}
