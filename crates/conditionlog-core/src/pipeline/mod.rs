//! Photo ingestion pipeline components.
//!
//! This module contains all the stages a selected photo passes through:
//! - **validate**: Type and size checks on the declared input
//! - **metadata**: Byte-level EXIF walk for capture time, GPS and orientation
//! - **decode**: Content-sniffed decoding on the blocking pool
//! - **compress**: Downscale and quality search to fit the byte budget
//! - **thumbnail**: Optional WebP gallery thumbnails
//! - **hash**: Content hashes for storage keys
//! - **discovery**: Find photos on disk and load them as inputs
//! - **progress**: Per-file stage log
//! - **channel**: Bounded progress channel for live consumers
//! - **ingest**: Orchestrates a batch and the storage handoff

pub mod channel;
pub mod compress;
pub mod decode;
pub mod discovery;
pub mod hash;
pub mod ingest;
pub mod media_type;
pub mod metadata;
pub mod progress;
pub mod thumbnail;
pub mod validate;

// Re-exports for convenient access
pub use channel::{progress_channel, ProgressReceiver, ProgressSender};
pub use compress::{AdaptiveCompressor, QualitySchedule};
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use hash::Hasher;
pub use ingest::{BatchReport, Ingestor};
pub use metadata::MetadataExtractor;
pub use progress::{FileStage, ProgressLog, ProgressSnapshot};
pub use thumbnail::ThumbnailGenerator;
pub use validate::Validator;
