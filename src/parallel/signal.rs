//! Work items and the per-item completion signal

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ThumbnailError;
use crate::processing::thumbnail_path;

/// One image file submitted for thumbnail generation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    path: PathBuf,
}

impl WorkItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where this item's thumbnail is written
    pub fn destination(&self) -> PathBuf {
        thumbnail_path(&self.path)
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<PathBuf> for WorkItem {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for WorkItem {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// How a work item ended
#[derive(Debug)]
pub enum Outcome {
    /// Thumbnail written to this path
    Thumbnail(PathBuf),
    /// Item failed; the error names the item and, for pipeline failures, the stage
    Failed(ThumbnailError),
}

/// The single signal every worker emits for its item
#[derive(Debug)]
pub struct Completion {
    pub item: WorkItem,
    pub outcome: Outcome,
}

impl Completion {
    pub fn new(item: WorkItem, outcome: Outcome) -> Self {
        Self { item, outcome }
    }

    /// Produced thumbnail, or `None` when the item failed
    pub fn artifact(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Thumbnail(path) => Some(path),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ThumbnailError> {
        match &self.outcome {
            Outcome::Thumbnail(_) => None,
            Outcome::Failed(err) => Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Thumbnail(_))
    }
}
