//! Batch ingestion - wires together all processing stages and the storage handoff.

use chrono::Utc;
use serde::Serialize;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::storage::{self, ObjectStore, RecordStore, StorageError};
use crate::types::{
    BatchSummary, CompressedImage, ExtractedMetadata, FileOutcome, IngestContext, IngestedPhoto,
    PhotoRecord, RawImageInput,
};

use super::channel::ProgressSender;
use super::compress::AdaptiveCompressor;
use super::decode::ImageDecoder;
use super::hash::Hasher;
use super::media_type;
use super::metadata::MetadataExtractor;
use super::progress::{FileStage, ProgressLog, ProgressSnapshot};
use super::thumbnail::{ThumbnailGenerator, THUMBNAIL_MEDIA_TYPE};
use super::validate::Validator;

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// One outcome per input, in input order
    pub outcomes: Vec<FileOutcome>,
    /// Every progress snapshot observed during the batch
    pub progress: ProgressLog,
    pub summary: BatchSummary,
}

/// A photo ready for the storage handoff.
struct PreparedPhoto {
    payload: CompressedImage,
    metadata: ExtractedMetadata,
    thumbnail: Option<Vec<u8>>,
}

/// Progress bookkeeping for one batch.
struct Tracker<'a> {
    log: ProgressLog,
    sender: Option<&'a ProgressSender>,
}

impl Tracker<'_> {
    async fn emit(&mut self, snapshot: ProgressSnapshot) {
        if !self.log.record(snapshot.clone()) {
            return;
        }
        if let Some(tx) = self.sender {
            if tx.send(snapshot).await.is_err() {
                tracing::debug!("Progress receiver dropped, continuing without live updates");
                self.sender = None;
            }
        }
    }
}

/// Runs selected files through validation, metadata extraction, compression
/// and the storage handoff.
pub struct Ingestor {
    validator: Validator,
    extractor: MetadataExtractor,
    compressor: AdaptiveCompressor,
    decoder: ImageDecoder,
    thumbnail_gen: ThumbnailGenerator,
}

impl Ingestor {
    /// Create a new ingestor with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            validator: Validator::new(config.limits.clone()),
            extractor: MetadataExtractor::new(config.metadata.clone()),
            compressor: AdaptiveCompressor::new(config.compression.clone(), &config.pipeline),
            decoder: ImageDecoder::new(&config.pipeline),
            thumbnail_gen: ThumbnailGenerator::new(config.thumbnail.clone()),
        }
    }

    /// Ingest a batch of files, one at a time in input order.
    ///
    /// A failing file never aborts the batch; it gets an `Error` outcome and
    /// the next file starts. Sort orders are handed out only to files that
    /// reach `Done`, starting at `ctx.existing_count`.
    pub async fn ingest_batch(
        &self,
        inputs: Vec<RawImageInput>,
        ctx: &IngestContext,
        objects: &dyn ObjectStore,
        records: &dyn RecordStore,
        progress: Option<&ProgressSender>,
    ) -> BatchReport {
        let start = std::time::Instant::now();
        let mut tracker = Tracker {
            log: ProgressLog::new(),
            sender: progress,
        };
        let mut outcomes = Vec::with_capacity(inputs.len());
        let mut summary = BatchSummary::default();

        tracing::info!(
            "Ingesting {} files into {}/{}",
            inputs.len(),
            ctx.report_id,
            ctx.room_id
        );

        for (index, input) in inputs.iter().enumerate() {
            let sort_order = ctx.existing_count.saturating_add(summary.succeeded as u32);
            match self
                .ingest_one(index, input, ctx, sort_order, objects, records, &mut tracker)
                .await
            {
                Ok((photo, saved)) => {
                    summary.succeeded += 1;
                    summary.bytes_saved += saved;
                    tracker
                        .emit(
                            ProgressSnapshot::new(index, &input.file_name, FileStage::Done)
                                .with_sizes(photo.original_size, Some(photo.compressed_size)),
                        )
                        .await;
                    outcomes.push(FileOutcome::Done(photo));
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::error!("{}", message);
                    summary.failed += 1;
                    tracker
                        .emit(
                            ProgressSnapshot::new(index, &input.file_name, FileStage::Error)
                                .with_error(&message),
                        )
                        .await;
                    outcomes.push(FileOutcome::Error {
                        file_name: input.file_name.clone(),
                        error_message: message,
                    });
                }
            }
        }

        tracing::info!("{} in {:?}", summary.message(), start.elapsed());

        BatchReport {
            outcomes,
            progress: tracker.log,
            summary,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn ingest_one(
        &self,
        index: usize,
        input: &RawImageInput,
        ctx: &IngestContext,
        sort_order: u32,
        objects: &dyn ObjectStore,
        records: &dyn RecordStore,
        tracker: &mut Tracker<'_>,
    ) -> PipelineResult<(IngestedPhoto, u64)> {
        tracker
            .emit(
                ProgressSnapshot::new(index, &input.file_name, FileStage::Validating)
                    .with_sizes(input.declared_size, None),
            )
            .await;
        let validate_start = std::time::Instant::now();
        self.validator.validate(input)?;
        tracing::trace!("  Validate: {:?}", validate_start.elapsed());

        tracker
            .emit(ProgressSnapshot::new(
                index,
                &input.file_name,
                FileStage::Compressing,
            ))
            .await;
        let prepare_start = std::time::Instant::now();
        let prepared = self.prepare(input).await?;
        tracing::trace!("  Compress: {:?}", prepare_start.elapsed());

        tracker
            .emit(
                ProgressSnapshot::new(index, &input.file_name, FileStage::Uploading)
                    .with_sizes(input.len(), Some(prepared.payload.size())),
            )
            .await;
        let handoff_start = std::time::Instant::now();
        let stored = self
            .handoff(input, prepared, ctx, sort_order, objects, records)
            .await;
        tracing::trace!("  Handoff: {:?}", handoff_start.elapsed());
        stored
    }

    /// Extract metadata, compress (with fallback) and build the thumbnail.
    async fn prepare(&self, input: &RawImageInput) -> PipelineResult<PreparedPhoto> {
        let metadata = self.extractor.extract(input);

        let payload = match self.compressor.compress(input).await {
            Ok(payload) => payload,
            Err(e) => {
                let max_bytes = self.validator.max_bytes();
                if input.len() > max_bytes {
                    return Err(PipelineError::FallbackTooLarge {
                        file_name: input.file_name.clone(),
                        size_mb: input.len() as f64 / (1024.0 * 1024.0),
                        max_mb: max_bytes / (1024 * 1024),
                    });
                }
                tracing::warn!("Compression failed, uploading original: {}", e);
                CompressedImage::passthrough(input)
            }
        };

        let thumbnail = if self.thumbnail_gen.is_enabled() {
            match self
                .decoder
                .decode(payload.data.clone(), &payload.file_name)
                .await
            {
                Ok(decoded) => self.thumbnail_gen.generate(&decoded.image),
                Err(e) => {
                    tracing::debug!("No thumbnail for {}: {}", payload.file_name, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(PreparedPhoto {
            payload,
            metadata,
            thumbnail,
        })
    }

    /// Store the payload, the thumbnail and the record.
    async fn handoff(
        &self,
        input: &RawImageInput,
        prepared: PreparedPhoto,
        ctx: &IngestContext,
        sort_order: u32,
        objects: &dyn ObjectStore,
        records: &dyn RecordStore,
    ) -> PipelineResult<(IngestedPhoto, u64)> {
        let PreparedPhoto {
            payload,
            metadata,
            thumbnail,
        } = prepared;
        let handoff_err = |source: StorageError| PipelineError::Handoff {
            file_name: input.file_name.clone(),
            source,
        };

        let hash = Hasher::short_hash(&payload.data);
        let storage_path =
            storage::photo_key(ctx, &hash, media_type::extension_for(&payload.media_type));
        let url = objects
            .put(&storage_path, &payload.data, &payload.media_type)
            .await
            .map_err(handoff_err)?;

        let thumbnail_path = match thumbnail {
            Some(bytes) => {
                let key = storage::thumbnail_key(ctx, &hash);
                objects
                    .put(&key, &bytes, THUMBNAIL_MEDIA_TYPE)
                    .await
                    .map_err(handoff_err)?;
                Some(key)
            }
            None => None,
        };

        // Re-encoding bakes the rotation into the pixels and drops the tag.
        let orientation = if payload.is_reencoded() {
            1
        } else {
            metadata.orientation
        };
        let taken_at = metadata
            .capture_timestamp
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let record = PhotoRecord {
            room_id: ctx.room_id.clone(),
            report_id: ctx.report_id.clone(),
            storage_path: storage_path.clone(),
            thumbnail_path: thumbnail_path.clone(),
            media_type: payload.media_type.clone(),
            taken_at,
            latitude: metadata.latitude,
            longitude: metadata.longitude,
            orientation,
            sort_order,
            original_size: payload.original_size,
            compressed_size: payload.size(),
            caption: None,
            notes: None,
        };
        let record_id = records.insert(&record).await.map_err(handoff_err)?;

        let saved = if payload.is_reencoded() {
            payload.bytes_saved()
        } else {
            0
        };

        tracing::debug!(
            "Stored {} as {} (sort order {}, {} -> {} bytes)",
            input.file_name,
            storage_path,
            sort_order,
            payload.original_size,
            payload.size()
        );

        Ok((
            IngestedPhoto {
                file_name: payload.file_name.clone(),
                media_type: payload.media_type.clone(),
                payload_bytes: payload.size(),
                capture_timestamp: metadata.capture_timestamp,
                latitude: metadata.latitude,
                longitude: metadata.longitude,
                sort_order,
                original_size: payload.original_size,
                compressed_size: payload.size(),
                storage_path,
                url,
                thumbnail_path,
                record_id,
            },
            saved,
        ))
    }
}
