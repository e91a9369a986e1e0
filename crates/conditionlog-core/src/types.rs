//! Core data types for the photo ingestion pipeline.
//!
//! Inputs arrive as [`RawImageInput`], leave as [`FileOutcome`]s collected in a
//! batch report. Everything here lives for a single ingestion call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A user-selected file as handed over by the picker, drag-and-drop or camera.
///
/// Immutable. The declared type and size come from the host surface and are
/// what the validator judges; the bytes are only read by later stages.
#[derive(Debug, Clone)]
pub struct RawImageInput {
    /// Original file name (used in messages and for the output name)
    pub file_name: String,

    /// Declared media type, e.g. "image/jpeg". `None` when the host had none.
    pub media_type: Option<String>,

    /// Declared size in bytes
    pub declared_size: u64,

    /// File contents
    pub data: Arc<[u8]>,
}

impl RawImageInput {
    /// Create an input whose declared size is the payload length.
    pub fn new(
        file_name: impl Into<String>,
        media_type: Option<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        let data = data.into();
        Self {
            file_name: file_name.into(),
            media_type,
            declared_size: data.len() as u64,
            data,
        }
    }

    /// Override the declared size (a picker may report it independently).
    pub fn with_declared_size(mut self, declared_size: u64) -> Self {
        self.declared_size = declared_size;
        self
    }

    /// Declared media type, or "" when none was given.
    pub fn media_type_str(&self) -> &str {
        self.media_type.as_deref().unwrap_or("")
    }

    /// Actual payload length in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the payload has no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outcome of validating a single input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Capture metadata recovered from an embedded EXIF segment.
///
/// All-default is a normal result: non-JPEG inputs, files without EXIF and
/// corrupt segments all produce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    /// Capture time as "YYYY-MM-DDTHH:MM:SS" (no zone, as recorded by the device)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_timestamp: Option<String>,

    /// GPS latitude (decimal degrees, south negative)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// GPS longitude (decimal degrees, west negative)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// EXIF orientation, normally 1-8. Stored as read.
    pub orientation: u16,
}

impl Default for ExtractedMetadata {
    fn default() -> Self {
        Self {
            capture_timestamp: None,
            latitude: None,
            longitude: None,
            orientation: 1,
        }
    }
}

impl ExtractedMetadata {
    /// True when nothing was recovered.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// The ready-to-upload payload produced by the compressor.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    /// Output file name (extension normalized when re-encoded)
    pub file_name: String,

    /// Output media type
    pub media_type: String,

    /// Payload bytes
    pub data: Arc<[u8]>,

    /// Size of the input payload in bytes
    pub original_size: u64,

    /// Modification time stamped on the output
    pub modified_at: DateTime<Utc>,

    /// JPEG quality (percent) of the final encode; `None` when the original
    /// bytes are passed through untouched
    pub quality: Option<u8>,

    /// Output width in pixels, when the image was decoded
    pub width: Option<u32>,

    /// Output height in pixels, when the image was decoded
    pub height: Option<u32>,
}

impl CompressedImage {
    /// Wrap the original input unchanged.
    pub fn passthrough(input: &RawImageInput) -> Self {
        Self {
            file_name: input.file_name.clone(),
            media_type: input.media_type_str().to_string(),
            data: Arc::clone(&input.data),
            original_size: input.len(),
            modified_at: Utc::now(),
            quality: None,
            width: None,
            height: None,
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the payload was produced by a re-encode.
    pub fn is_reencoded(&self) -> bool {
        self.quality.is_some()
    }

    /// Bytes saved relative to the original (0 when the re-encode grew).
    pub fn bytes_saved(&self) -> u64 {
        self.original_size.saturating_sub(self.size())
    }
}

/// Who and where a batch of photos belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestContext {
    pub user_id: String,
    pub report_id: String,
    pub room_id: String,

    /// Photos already stored in the room; seeds the sort-order counter
    pub existing_count: u32,
}

/// The row handed to the record store for each uploaded photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub room_id: String,
    pub report_id: String,
    pub storage_path: String,
    pub thumbnail_path: Option<String>,
    pub media_type: String,
    /// Capture timestamp when known, else the upload time (RFC 3339)
    pub taken_at: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub orientation: u16,
    pub sort_order: u32,
    pub original_size: u64,
    pub compressed_size: u64,
    pub caption: Option<String>,
    pub notes: Option<String>,
}

/// A photo that made it through the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedPhoto {
    pub file_name: String,
    pub media_type: String,
    pub payload_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub sort_order: u32,
    pub original_size: u64,
    pub compressed_size: u64,
    pub storage_path: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,
    pub record_id: String,
}

/// Per-file result of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Done(IngestedPhoto),
    Error {
        file_name: String,
        error_message: String,
    },
}

impl FileOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, FileOutcome::Done(_))
    }

    pub fn file_name(&self) -> &str {
        match self {
            FileOutcome::Done(photo) => &photo.file_name,
            FileOutcome::Error { file_name, .. } => file_name,
        }
    }
}

/// Batch-level totals for the completion message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Sum of `original - compressed` over re-encoded files
    pub bytes_saved: u64,
}

impl BatchSummary {
    /// Human-readable completion message.
    pub fn message(&self) -> String {
        let noun = if self.succeeded == 1 { "photo" } else { "photos" };
        let mut msg = format!("Uploaded {} {}", self.succeeded, noun);
        if self.bytes_saved > 0 {
            msg.push_str(&format!(
                " (saved {:.1}MB)",
                self.bytes_saved as f64 / (1024.0 * 1024.0)
            ));
        }
        if self.failed > 0 {
            msg.push_str(&format!(", {} failed", self.failed));
        }
        msg
    }
}
