//! Filesystem-backed stores: objects as files under a root, records as JSONL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::output::{OutputFormat, OutputWriter};
use crate::types::PhotoRecord;

use super::{check_key, ObjectStore, RecordStore, StorageError, StorageResult};

/// Object store writing each key as a file below a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create the store, creating the root directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }

    fn url_for(path: &Path) -> String {
        format!("file://{}", path.display())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            key = %key,
            content_type = %content_type,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stored object"
        );

        Ok(Self::url_for(&path))
    }
}

/// One line of the record log.
#[derive(Serialize)]
struct StoredRecord<'a> {
    id: String,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a PhotoRecord,
}

/// Record store appending each photo row as a JSON line.
pub struct JsonlRecordStore {
    path: PathBuf,
    writer: Mutex<OutputWriter<BufWriter<File>>>,
}

impl JsonlRecordStore {
    /// Open (or create) the record log for appending.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let writer = OutputWriter::new(BufWriter::new(file), OutputFormat::JsonLines, false);
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn insert(&self, record: &PhotoRecord) -> StorageResult<String> {
        let id = Uuid::new_v4().to_string();
        let line = StoredRecord {
            id: id.clone(),
            created_at: Utc::now(),
            record,
        };

        let mut writer = self.writer.lock().await;
        writer
            .write(&line)
            .map_err(|e| StorageError::InsertFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| StorageError::InsertFailed(e.to_string()))?;

        tracing::debug!(id = %id, storage_path = %record.storage_path, "Inserted photo record");
        Ok(id)
    }
}
