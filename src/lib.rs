//! Thumbfan - Concurrent Batch Thumbnail Generator
//!
//! Turns a batch of image files into 80x80 JPEG thumbnails written next to
//! their sources as `<source>.thumb.jpg`. Each file is handled by its own
//! worker; the batch finishes once every worker has reported.
//!
//! # Architecture
//!
//! - [`BatchOrchestrator`] spawns one [`Worker`](parallel::Worker) per
//!   [`WorkItem`] plus a [`Waiter`](parallel::Waiter), then drains the result
//!   channel with a [`Collector`](parallel::Collector).
//! - Each worker emits exactly one [`Completion`] through a
//!   [`CompletionGuard`](parallel::CompletionGuard), which also counts the
//!   worker out of the batch's [`CompletionBarrier`](parallel::CompletionBarrier)
//!   on every exit path.
//! - The image work itself sits behind the [`Transform`] trait; the default
//!   [`ThumbnailTransform`] decodes, resizes and JPEG-encodes with the `image` crate.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use thumbfan::{BatchOrchestrator, ThumbnailTransform};
//!
//! # async fn example() -> thumbfan::Result<()> {
//! let orchestrator = BatchOrchestrator::new(Arc::new(ThumbnailTransform::new()))
//!     .with_max_concurrency(Some(8));
//!
//! let report = orchestrator.run_directory("photos").await?;
//! println!("{} thumbnails, {} failures", report.succeeded(), report.failed());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{Config, LoggingConfig, ProcessingConfig, ThumbnailConfig};
pub use error::{Result, Stage, ThumbnailError, TransformError};
pub use parallel::{BatchOrchestrator, BatchReport, Completion, Outcome, WorkItem};
pub use processing::{FilterType, ThumbnailTransform, Transform};

use tracing::info;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the filter taken from `RUST_LOG`
///
/// Does nothing if a global subscriber is already installed.
pub fn init() -> Result<()> {
    if tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish(),
    )
    .is_ok()
    {
        info!("Thumbfan v{} initialized", VERSION);
    }

    log_system_info();
    Ok(())
}

/// Initialize logging from configuration
pub fn init_with_config(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.logging.level).map_err(|e| {
        ThumbnailError::config(format!(
            "Invalid log level '{}': {}",
            config.logging.level, e
        ))
    })?;

    let installed = if config.logging.json_format {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    };

    if installed {
        info!("Thumbfan v{} initialized with custom config", VERSION);
    }

    log_system_info();
    Ok(())
}

fn log_system_info() {
    info!("Detected {} CPU cores", num_cpus::get());
    info!("  JPEG encode: {}", image::ImageFormat::Jpeg.can_write());
}
