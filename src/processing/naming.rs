//! Thumbnail file naming

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to a source path to name its thumbnail
pub const THUMBNAIL_SUFFIX: &str = ".thumb.jpg";

/// Destination path for a source: `<source>.thumb.jpg`, next to the source
pub fn thumbnail_path<P: AsRef<Path>>(source: P) -> PathBuf {
    let mut name = OsString::from(source.as_ref().as_os_str());
    name.push(THUMBNAIL_SUFFIX);
    PathBuf::from(name)
}

/// Check if a path already names a generated thumbnail
pub fn is_thumbnail<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(THUMBNAIL_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_path_appends_suffix() {
        assert_eq!(
            thumbnail_path("photos/cat.png"),
            PathBuf::from("photos/cat.png.thumb.jpg")
        );
        assert_eq!(thumbnail_path("noext"), PathBuf::from("noext.thumb.jpg"));
    }

    #[test]
    fn test_is_thumbnail() {
        assert!(is_thumbnail("a/cat.png.thumb.jpg"));
        assert!(!is_thumbnail("a/cat.png"));
        assert!(!is_thumbnail("a/thumb.jpg"));
    }
}
