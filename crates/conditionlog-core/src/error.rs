//! Error types for the ConditionLog ingestion pipeline.
//!
//! Errors are organized by stage so a failed file can be reported with the
//! exact reason: validation messages are shown to the user verbatim, while
//! compression and storage failures carry the file name and stage.

use thiserror::Error;

use crate::storage::StorageError;

/// Top-level error type for ConditionLog operations.
#[derive(Error, Debug)]
pub enum ConditionLogError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Rejections produced by the validator.
///
/// The `Display` text is the message shown to the user for the skipped file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("\"{file_name}\" is not a supported image format. Use JPEG, PNG, or WebP.")]
    UnsupportedType {
        file_name: String,
        media_type: String,
    },

    #[error("\"{file_name}\" is {size_mb:.1}MB, exceeding the {max_mb}MB limit.")]
    TooLarge {
        file_name: String,
        size_mb: f64,
        max_mb: u64,
    },

    #[error("\"{file_name}\" is empty.")]
    Empty { file_name: String },
}

/// Decode or encode failures inside the adaptive compressor.
///
/// The ingestor reacts to any of these by falling back to the original bytes.
#[derive(Error, Debug)]
pub enum CompressionError {
    /// The payload could not be decoded into a bitmap
    #[error("Decode error for {file_name}: {message}")]
    Decode { file_name: String, message: String },

    /// Re-encoding to the canonical format failed
    #[error("Encode error for {file_name}: {message}")]
    Encode { file_name: String, message: String },

    /// Decode/encode did not finish in time
    #[error("Timeout in {stage} stage for {file_name} after {timeout_ms}ms")]
    Timeout {
        file_name: String,
        stage: String,
        timeout_ms: u64,
    },
}

/// Per-file pipeline failures. None of these abort a batch.
///
/// Compression failures never appear here: the original bytes are uploaded
/// instead, or the file fails with `FallbackTooLarge`.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input rejected before any processing
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Compression failed and the original bytes exceed the upload ceiling
    #[error("\"{file_name}\" could not be compressed and is too large to upload ({size_mb:.1}MB > {max_mb}MB).")]
    FallbackTooLarge {
        file_name: String,
        size_mb: f64,
        max_mb: u64,
    },

    /// Object or record storage rejected the handoff
    #[error("Failed to upload {file_name}: {source}")]
    Handoff {
        file_name: String,
        #[source]
        source: StorageError,
    },
}

/// Convenience type alias for ConditionLog results.
pub type Result<T> = std::result::Result<T, ConditionLogError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
