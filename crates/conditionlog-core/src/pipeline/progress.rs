//! Per-file progress as an append-only log of immutable snapshots.
//!
//! Each file moves `validating → compressing → uploading → done`, and may
//! jump to `error` from any non-terminal stage. The log refuses anything
//! else, so a replay of it is always a valid history.

use serde::{Deserialize, Serialize};

/// Processing stage of a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    Validating,
    Compressing,
    Uploading,
    Done,
    Error,
}

impl FileStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStage::Done | FileStage::Error)
    }

    /// Whether a file at `self` may move to `next`.
    pub fn can_transition_to(self, next: FileStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == FileStage::Error || next > self
    }
}

impl std::fmt::Display for FileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileStage::Validating => "validating",
            FileStage::Compressing => "compressing",
            FileStage::Uploading => "uploading",
            FileStage::Done => "done",
            FileStage::Error => "error",
        };
        f.write_str(s)
    }
}

/// One observed state of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Position of the file in the batch
    pub index: usize,
    pub file_name: String,
    pub stage: FileStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
}

impl ProgressSnapshot {
    pub fn new(index: usize, file_name: impl Into<String>, stage: FileStage) -> Self {
        Self {
            index,
            file_name: file_name.into(),
            stage,
            error: None,
            original_size: None,
            compressed_size: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_sizes(mut self, original: u64, compressed: Option<u64>) -> Self {
        self.original_size = Some(original);
        self.compressed_size = compressed;
        self
    }
}

/// Ordered history of snapshots for a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressLog {
    snapshots: Vec<ProgressSnapshot>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot if it is a legal next state for its file.
    ///
    /// The first snapshot of a file must be `Validating` or `Error`.
    /// Returns `false` (and records nothing) otherwise.
    pub fn record(&mut self, snapshot: ProgressSnapshot) -> bool {
        let allowed = match self.latest(snapshot.index) {
            Some(prev) => prev.stage.can_transition_to(snapshot.stage),
            None => matches!(snapshot.stage, FileStage::Validating | FileStage::Error),
        };
        if !allowed {
            tracing::warn!(
                "Rejected progress transition for {} to {}",
                snapshot.file_name,
                snapshot.stage
            );
            return false;
        }
        self.snapshots.push(snapshot);
        true
    }

    /// All snapshots in the order they were recorded.
    pub fn snapshots(&self) -> &[ProgressSnapshot] {
        &self.snapshots
    }

    /// Snapshots of one file, oldest first.
    pub fn history(&self, index: usize) -> impl Iterator<Item = &ProgressSnapshot> {
        self.snapshots.iter().filter(move |s| s.index == index)
    }

    /// Most recent snapshot of one file.
    pub fn latest(&self, index: usize) -> Option<&ProgressSnapshot> {
        self.snapshots.iter().rev().find(|s| s.index == index)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
