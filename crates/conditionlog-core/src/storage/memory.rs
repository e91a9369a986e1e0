//! In-memory stores, used for dry runs and tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::types::PhotoRecord;

use super::{check_key, ObjectStore, RecordStore, StorageError, StorageResult};

/// An object held by [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Object store keeping everything in a vector.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<Vec<StoredObject>>,
    fail: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of stored objects, in insertion order.
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects
            .lock()
            .map(|objects| objects.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> StorageResult<String> {
        check_key(key)?;
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("object store unavailable".to_string()));
        }
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::UploadFailed("object store poisoned".to_string()))?;
        objects.push(StoredObject {
            key: key.to_string(),
            content_type: content_type.to_string(),
            data: data.to_vec(),
        });
        Ok(format!("memory://{key}"))
    }
}

/// Record store keeping rows in a vector; ids are `record-{n}`.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<(String, PhotoRecord)>>,
    fail: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert` fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of inserted records with their ids.
    pub fn records(&self) -> Vec<(String, PhotoRecord)> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: &PhotoRecord) -> StorageResult<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::InsertFailed("record store unavailable".to_string()));
        }
        let mut records = self
            .records
            .lock()
            .map_err(|_| StorageError::InsertFailed("record store poisoned".to_string()))?;
        let id = format!("record-{}", records.len());
        records.push((id.clone(), record.clone()));
        Ok(id)
    }
}
