//! Storage capabilities the ingestor hands finished photos to.
//!
//! The pipeline only needs two narrow operations: put an object and get a URL
//! back, and insert a photo record and get its id back. Backends live behind
//! these traits so the ingestor never depends on a concrete service.

mod local;
mod memory;

pub use local::{JsonlRecordStore, LocalObjectStore};
pub use memory::{MemoryObjectStore, MemoryRecordStore, StoredObject};

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{IngestContext, PhotoRecord};

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Record insert failed: {0}")]
    InsertFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage for photo payloads and thumbnails.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key` and return a URL for it.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> StorageResult<String>;
}

/// Record storage for photo rows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a photo record and return its id.
    async fn insert(&self, record: &PhotoRecord) -> StorageResult<String>;
}

/// Object key for a photo payload: `{user}/{report}/{room}/{hash}.{ext}`.
pub fn photo_key(ctx: &IngestContext, hash: &str, extension: &str) -> String {
    format!(
        "{}/{}/{}/{}.{}",
        ctx.user_id, ctx.report_id, ctx.room_id, hash, extension
    )
}

/// Object key for a photo's thumbnail: `{user}/{report}/{room}/{hash}_thumb.webp`.
pub fn thumbnail_key(ctx: &IngestContext, hash: &str) -> String {
    format!(
        "{}/{}/{}/{}_thumb.webp",
        ctx.user_id, ctx.report_id, ctx.room_id, hash
    )
}

/// Reject keys that could escape a storage root.
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    let escapes = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if escapes {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
