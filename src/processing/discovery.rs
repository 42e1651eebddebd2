//! Source directory listing

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, ThumbnailError};
use crate::processing::naming::is_thumbnail;

/// List the regular files of `dir` that should get a thumbnail
///
/// Not recursive. Subdirectories, unreadable entries, entries with an empty
/// name and previously generated thumbnails are skipped. The result is
/// sorted by file name so dispatch order is stable between runs.
pub fn discover_items<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();

    let metadata = std::fs::metadata(dir).map_err(|source| ThumbnailError::Discovery {
        path: dir.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ThumbnailError::Discovery {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            debug!("Skipping subdir {:?}", entry.path());
            continue;
        }
        if !entry.file_type().is_file() {
            debug!("Skipping non-regular entry {:?}", entry.path());
            continue;
        }
        if entry.file_name().is_empty() {
            debug!("Skipping entry with empty name");
            continue;
        }
        if is_thumbnail(entry.path()) {
            debug!("Skipping existing thumbnail {:?}", entry.path());
            continue;
        }

        files.push(entry.into_path());
    }

    debug!("Discovered {} files in {:?}", files.len(), dir);
    Ok(files)
}
