//! Error types and handling for Thumbfan

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for Thumbfan operations
pub type Result<T> = std::result::Result<T, ThumbnailError>;

/// Pipeline stage a per-item failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Opening or reading the source file
    Open,
    /// Decoding the source bytes into an image
    Decode,
    /// Creating the destination file
    Create,
    /// Encoding the thumbnail and writing it out
    Encode,
    /// Flushing and syncing the destination file to disk
    Close,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Decode => "decode",
            Self::Create => "create",
            Self::Encode => "encode",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

/// Main error type for Thumbfan operations
///
/// The first group of variants describes a single work item and never aborts
/// a batch. The rest are orchestration-level failures returned to the caller.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// Source file could not be opened or read
    #[error("open file {item:?}: {source}")]
    Open {
        item: PathBuf,
        source: std::io::Error,
    },

    /// Source bytes are not a recognized or valid image
    #[error("decode image {item:?}: {source}")]
    Decode {
        item: PathBuf,
        source: image::ImageError,
    },

    /// Destination file could not be created
    #[error("create thumb file for {item:?}: {source}")]
    Create {
        item: PathBuf,
        source: std::io::Error,
    },

    /// Thumbnail could not be encoded or written
    #[error("encode jpeg for {item:?}: {source}")]
    Encode {
        item: PathBuf,
        source: image::ImageError,
    },

    /// Destination file could not be flushed or synced
    #[error("close thumb file for {item:?}: {source}")]
    Close {
        item: PathBuf,
        source: std::io::Error,
    },

    /// Item exceeded the configured processing deadline
    #[error("processing timeout after {timeout_ms}ms (file: {item:?})")]
    Timeout { item: PathBuf, timeout_ms: u64 },

    /// Worker crashed before it could report a result
    #[error("worker for {item:?} stopped unexpectedly: {message}")]
    Panicked { item: PathBuf, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Source directory could not be listed
    #[error("cannot list source directory {path:?}: {source}")]
    Discovery {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Orchestration could not be carried out
    #[error("Batch orchestration error: {message}")]
    BatchError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl ThumbnailError {
    pub fn open(item: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            item: item.into(),
            source,
        }
    }

    pub fn decode(item: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            item: item.into(),
            source,
        }
    }

    pub fn create(item: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Create {
            item: item.into(),
            source,
        }
    }

    pub fn encode(item: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Encode {
            item: item.into(),
            source,
        }
    }

    pub fn close(item: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Close {
            item: item.into(),
            source,
        }
    }

    /// Create a new timeout error
    pub fn timeout(item: impl Into<PathBuf>, limit: Duration) -> Self {
        Self::Timeout {
            item: item.into(),
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a new crashed-worker error
    pub fn panicked<S: Into<String>>(item: impl Into<PathBuf>, message: S) -> Self {
        Self::Panicked {
            item: item.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new orchestration error
    pub fn batch<S: Into<String>>(message: S) -> Self {
        Self::BatchError {
            message: message.into(),
        }
    }

    /// Pipeline stage for failures raised by a stage of the pipeline
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Open { .. } => Some(Stage::Open),
            Self::Decode { .. } => Some(Stage::Decode),
            Self::Create { .. } => Some(Stage::Create),
            Self::Encode { .. } => Some(Stage::Encode),
            Self::Close { .. } => Some(Stage::Close),
            _ => None,
        }
    }

    /// Whether this error describes one work item rather than the batch
    pub fn is_item_failure(&self) -> bool {
        self.item().is_some()
    }

    /// The work item this error belongs to, if any
    pub fn item(&self) -> Option<&Path> {
        match self {
            Self::Open { item, .. }
            | Self::Decode { item, .. }
            | Self::Create { item, .. }
            | Self::Encode { item, .. }
            | Self::Close { item, .. }
            | Self::Timeout { item, .. }
            | Self::Panicked { item, .. } => Some(item),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Decode { item, .. } => {
                format!("{} is not a readable image", item.display())
            }
            Self::Timeout { item, timeout_ms } => {
                format!(
                    "{} took longer than {}ms. Raise the timeout or lower the concurrency.",
                    item.display(),
                    timeout_ms
                )
            }
            other => other.to_string(),
        }
    }
}

// Convert serde errors to our error type
impl From<toml::de::Error> for ThumbnailError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for ThumbnailError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

/// Failure reported by a [`Transform`](crate::processing::Transform)
///
/// Carries no item identity; the worker attaches it with [`TransformError::for_item`].
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("input is not a valid image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("output serialization failed: {0}")]
    Encode(#[source] image::ImageError),
}

impl TransformError {
    /// Attach the work item the transform was running for
    pub fn for_item(self, item: impl Into<PathBuf>) -> ThumbnailError {
        match self {
            Self::Decode(source) => ThumbnailError::decode(item, source),
            Self::Encode(source) => ThumbnailError::encode(item, source),
        }
    }
}
