//! Sub-configuration structs with defaults matching the web client's constants.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Input limits enforced before and after compression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum raw input size in megabytes (also the fallback upload ceiling)
    pub max_file_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 20,
        }
    }
}

impl LimitsConfig {
    /// The size ceiling in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// EXIF extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// How many leading bytes to scan for the APP1 segment
    pub scan_bytes: usize,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            scan_bytes: 128 * 1024,
        }
    }
}

/// Adaptive compression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Byte budget for the compressed payload
    pub target_max_bytes: u64,

    /// Longest edge allowed before downscaling
    pub max_dimension: u32,

    /// First JPEG quality attempted (0.0 - 1.0)
    pub initial_quality: f32,

    /// Quality decrement per retry
    pub quality_step: f32,

    /// Lowest quality the search will try
    pub min_quality: f32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            target_max_bytes: 2 * 1024 * 1024,
            max_dimension: 3840,
            initial_quality: 0.82,
            quality_step: 0.1,
            min_quality: 0.3,
        }
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Whether to generate and upload thumbnails
    pub enabled: bool,

    /// Thumbnail size in pixels (longest edge)
    pub size: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 400,
        }
    }
}

/// Batch pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Progress snapshots buffered before the ingestor waits on the consumer
    pub progress_buffer: usize,

    /// Decode + encode timeout per file in milliseconds
    pub compress_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            progress_buffer: 64,
            compress_timeout_ms: 30_000,
        }
    }
}

/// Local storage settings used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory where photo objects are written
    pub root_dir: PathBuf,

    /// JSONL file (relative to `root_dir` unless absolute) receiving photo records
    pub records_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("~/.conditionlog/storage"),
            records_file: PathBuf::from("photos.jsonl"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
