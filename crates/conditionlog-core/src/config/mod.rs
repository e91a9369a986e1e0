//! Configuration management for ConditionLog.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default`, so a partial file is fine.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input limits
    pub limits: LimitsConfig,

    /// EXIF extraction settings
    pub metadata: MetadataConfig,

    /// Adaptive compression settings
    pub compression: CompressionConfig,

    /// Thumbnail generation settings
    pub thumbnail: ThumbnailConfig,

    /// Batch pipeline settings
    pub pipeline: PipelineConfig,

    /// Local storage settings
    pub storage: StorageConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.conditionlog.conditionlog/config.toml
    /// - Linux: ~/.config/conditionlog/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\conditionlog\config\config.toml
    ///
    /// Falls back to ~/.conditionlog/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "conditionlog", "conditionlog")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".conditionlog").join("config.toml")
            })
    }

    /// Get the resolved storage root (with ~ expansion).
    pub fn storage_root(&self) -> PathBuf {
        let path_str = self.storage.root_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Get the resolved photo record file path.
    pub fn records_path(&self) -> PathBuf {
        if self.storage.records_file.is_absolute() {
            self.storage.records_file.clone()
        } else {
            self.storage_root().join(&self.storage.records_file)
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.limits.max_file_size_mb, 20);
        assert_eq!(config.metadata.scan_bytes, 131_072);
        assert_eq!(config.compression.target_max_bytes, 2_097_152);
        assert_eq!(config.compression.max_dimension, 3840);
        assert!(!config.thumbnail.enabled);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[limits]"));
        assert!(toml.contains("[compression]"));
        assert!(toml.contains("[storage]"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml("[compression]\nmax_dimension = 2048\n").unwrap();
        assert_eq!(config.compression.max_dimension, 2048);
        assert_eq!(config.compression.target_max_bytes, 2 * 1024 * 1024);
        assert_eq!(config.limits.max_file_size_mb, 20);
    }

    #[test]
    fn test_from_toml_runs_validation() {
        let err = Config::from_toml("[limits]\nmax_file_size_mb = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_file_size_mb"));
    }

    #[test]
    fn test_records_path_relative_to_root() {
        let mut config = Config::default();
        config.storage.root_dir = PathBuf::from("/srv/photos");
        assert_eq!(config.records_path(), PathBuf::from("/srv/photos/photos.jsonl"));

        config.storage.records_file = PathBuf::from("/var/log/records.jsonl");
        assert_eq!(config.records_path(), PathBuf::from("/var/log/records.jsonl"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[thumbnail]\nenabled = true\nsize = 256\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.thumbnail.enabled);
        assert_eq!(config.thumbnail.size, 256);
    }
}
