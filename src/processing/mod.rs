//! Thumbnail transform: decode, resize and encode one image

use tracing::debug;

use crate::config::ThumbnailConfig;
use crate::error::TransformError;

pub mod discovery;
pub mod naming;
pub mod resize;

pub use discovery::*;
pub use naming::*;
pub use resize::*;

/// Turns raw image bytes into encoded thumbnail bytes
///
/// Implementations are pure and blocking: no I/O, no internal concurrency,
/// and no references to `input` kept after returning. Workers call them
/// from the blocking thread pool.
pub trait Transform: Send + Sync {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, TransformError>;
}

/// Fixed-size JPEG thumbnail transform backed by the `image` crate
#[derive(Debug, Clone)]
pub struct ThumbnailTransform {
    width: u32,
    height: u32,
    filter: FilterType,
    quality: u8,
}

impl ThumbnailTransform {
    /// 80x80 Lanczos3 thumbnails at JPEG quality 75
    pub fn new() -> Self {
        Self::from_config(&ThumbnailConfig::default())
    }

    pub fn from_config(config: &ThumbnailConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            filter: config.filter,
            quality: config.quality,
        }
    }

    /// Set the output dimensions
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the resampling filter
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Set the JPEG quality
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }
}

impl Default for ThumbnailTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for ThumbnailTransform {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let source = image::load_from_memory(input).map_err(TransformError::Decode)?;
        debug!("Decoded {}x{} image", source.width(), source.height());

        let thumbnail = resize_exact(&source, self.width, self.height, self.filter);
        debug!("Resized to {}x{}", thumbnail.width(), thumbnail.height());

        let encoded = encode_jpeg(&thumbnail, self.quality).map_err(TransformError::Encode)?;
        debug!("Encoded {} bytes of JPEG", encoded.len());

        Ok(encoded)
    }
}
