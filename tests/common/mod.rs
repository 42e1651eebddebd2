#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::error::{DecodingError, EncodingError, ImageFormatHint};
use image::{ImageError, Rgb, RgbImage};
use thumbfan::{Transform, TransformError};

/// Write a small gradient image; the format follows the extension
pub fn write_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 128])
    })
    .save(path)
    .unwrap();
}

pub fn write_corrupt(path: &Path) {
    std::fs::write(path, b"\xFF\xD8\xFF this jpeg header lies").unwrap();
}

/// What a scripted item should do inside the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Succeed,
    FailDecode,
    FailEncode,
}

impl Action {
    fn keyword(self) -> &'static str {
        match self {
            Self::Succeed => "ok",
            Self::FailDecode => "decode",
            Self::FailEncode => "encode",
        }
    }
}

/// Write a source whose content tells [`ScriptedTransform`] how to behave
pub fn write_script(path: &Path, action: Action, delay: Duration) {
    let script = format!("{} {}", action.keyword(), delay.as_millis());
    std::fs::write(path, script).unwrap();
}

/// Transform driven by its input: `"<ok|decode|encode> <delay_ms>"`
pub struct ScriptedTransform;

impl Transform for ScriptedTransform {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let script = String::from_utf8_lossy(input);
        let mut parts = script.split_whitespace();
        let action = parts.next().unwrap_or("decode");
        let delay: u64 = parts.next().and_then(|d| d.parse().ok()).unwrap_or(0);

        std::thread::sleep(Duration::from_millis(delay));

        match action {
            "ok" => Ok(b"scripted thumbnail".to_vec()),
            "encode" => Err(TransformError::Encode(ImageError::Encoding(EncodingError::new(
                ImageFormatHint::Exact(image::ImageFormat::Jpeg),
                "scripted encode failure",
            )))),
            _ => Err(TransformError::Decode(ImageError::Decoding(DecodingError::new(
                ImageFormatHint::Unknown,
                "scripted decode failure",
            )))),
        }
    }
}

pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    let mut names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
