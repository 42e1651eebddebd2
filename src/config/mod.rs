//! Configuration management for Thumbfan

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThumbnailError};
use crate::processing::FilterType;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Thumbnail geometry and encoding
    pub thumbnail: ThumbnailConfig,

    /// Batch orchestration settings
    pub processing: ProcessingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Thumbnail geometry and encoding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Thumbnail width in pixels
    pub width: u32,

    /// Thumbnail height in pixels
    pub height: u32,

    /// Resampling filter used for downsizing
    pub filter: FilterType,

    /// JPEG quality (1-100)
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 80,
            filter: FilterType::Lanczos3,
            quality: 75,
        }
    }
}

/// Batch orchestration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Cap on simultaneous transforms (None = one running worker per item)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    /// Per-item processing deadline in seconds (None = wait forever)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_timeout_secs: Option<u64>,
}

impl ProcessingConfig {
    /// Per-item deadline as a duration
    pub fn item_timeout(&self) -> Option<Duration> {
        self.item_timeout_secs.map(Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ThumbnailError::config(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        match config_extension(path.as_ref()).as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(ThumbnailError::config(
                "Unsupported config file format. Use .toml or .yaml",
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = match config_extension(path.as_ref()).as_str() {
            "toml" => toml::to_string_pretty(self).map_err(|e| {
                ThumbnailError::config(format!("TOML serialization failed: {}", e))
            })?,
            "yaml" | "yml" => serde_yaml::to_string(self).map_err(|e| {
                ThumbnailError::config(format!("YAML serialization failed: {}", e))
            })?,
            _ => {
                return Err(ThumbnailError::config(
                    "Unsupported config file format. Use .toml or .yaml",
                ))
            }
        };

        std::fs::write(&path, content).map_err(|e| {
            ThumbnailError::config(format!(
                "Failed to write config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.thumbnail.width == 0 || self.thumbnail.height == 0 {
            return Err(ThumbnailError::config(
                "Thumbnail width and height must be greater than 0",
            ));
        }

        if self.thumbnail.quality == 0 || self.thumbnail.quality > 100 {
            return Err(ThumbnailError::config("Quality must be between 1 and 100"));
        }

        if self.processing.max_concurrency == Some(0) {
            return Err(ThumbnailError::config(
                "Concurrency limit must be greater than 0",
            ));
        }

        if self.processing.item_timeout_secs == Some(0) {
            return Err(ThumbnailError::config(
                "Item timeout must be greater than 0 seconds",
            ));
        }

        Ok(())
    }
}

fn config_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Default location searched when no config path is given
pub fn default_config_path() -> PathBuf {
    PathBuf::from("thumbfan.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.thumbnail.width, 80);
        assert_eq!(config.thumbnail.height, 80);
        assert_eq!(config.thumbnail.quality, 75);
        assert!(config.processing.max_concurrency.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.processing.max_concurrency = Some(4);

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.processing.max_concurrency, Some(4));
        assert_eq!(parsed.thumbnail.filter, FilterType::Lanczos3);

        let yaml_str = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml_str).unwrap();
        assert_eq!(parsed.thumbnail.width, 80);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[processing]\nitem_timeout_secs = 5\n").unwrap();
        assert_eq!(parsed.processing.item_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(parsed.thumbnail.width, 80);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_config_file_io() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();

        let toml_path = dir.path().join("thumbfan.toml");
        config.to_file(&toml_path).unwrap();
        let loaded = Config::from_file(&toml_path).unwrap();
        assert!(loaded.validate().is_ok());

        let yaml_path = dir.path().join("thumbfan.yaml");
        config.to_file(&yaml_path).unwrap();
        let loaded = Config::from_file(&yaml_path).unwrap();
        assert!(loaded.validate().is_ok());

        assert!(config.to_file(dir.path().join("thumbfan.ini")).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.processing.max_concurrency = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.thumbnail.quality = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.thumbnail.height = 0;
        assert!(config.validate().is_err());
    }
}
