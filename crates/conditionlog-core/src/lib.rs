//! ConditionLog Core - client-side photo ingestion for property condition reports.
//!
//! Photos selected for a room of a report are validated, mined for capture
//! metadata, compressed to an upload budget and handed to storage, with
//! per-file progress along the way.
//!
//! # Architecture
//!
//! Storage is reached only through the [`ObjectStore`] and [`RecordStore`]
//! traits, so the pipeline runs the same against local files, memory or a
//! remote service:
//!
//! ```text
//! File → Validate → Extract EXIF → Compress → Thumbnail → Put object → Insert record
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use conditionlog_core::{Config, ConditionLog, IngestContext, MemoryObjectStore, MemoryRecordStore};
//!
//! #[tokio::main]
//! async fn main() -> conditionlog_core::Result<()> {
//!     let app = ConditionLog::new(Config::load()?);
//!     let ctx = IngestContext {
//!         user_id: "u1".into(),
//!         report_id: "r1".into(),
//!         room_id: "kitchen".into(),
//!         existing_count: 0,
//!     };
//!     let report = app
//!         .ingest(inputs, &ctx, &MemoryObjectStore::new(), &MemoryRecordStore::new(), None)
//!         .await;
//!     println!("{}", report.summary.message());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    CompressionError, ConditionLogError, ConfigError, PipelineError, PipelineResult, Result,
    ValidationError,
};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{BatchReport, FileStage, Ingestor, ProgressLog, ProgressSnapshot};
pub use storage::{
    JsonlRecordStore, LocalObjectStore, MemoryObjectStore, MemoryRecordStore, ObjectStore,
    RecordStore, StorageError,
};
pub use types::{
    BatchSummary, CompressedImage, ExtractedMetadata, FileOutcome, IngestContext, IngestedPhoto,
    PhotoRecord, RawImageInput, ValidationResult,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ConditionLog entry point: a configured ingestor.
pub struct ConditionLog {
    config: Config,
    ingestor: Ingestor,
}

impl ConditionLog {
    /// Create a new instance with the given configuration.
    pub fn new(config: Config) -> Self {
        tracing::debug!("Initializing ConditionLog v{}", VERSION);
        let ingestor = Ingestor::new(&config);
        Self { config, ingestor }
    }

    /// Create a new instance from the config file (or defaults).
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(Config::load()?))
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ingest a batch of photos for one room.
    pub async fn ingest(
        &self,
        inputs: Vec<RawImageInput>,
        ctx: &IngestContext,
        objects: &dyn ObjectStore,
        records: &dyn RecordStore,
        progress: Option<&pipeline::ProgressSender>,
    ) -> BatchReport {
        self.ingestor
            .ingest_batch(inputs, ctx, objects, records, progress)
            .await
    }
}
