//! Adaptive compression: downscale oversized bitmaps and re-encode to JPEG,
//! lowering quality until the payload fits the byte budget.

use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, RgbImage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::{CompressionConfig, PipelineConfig};
use crate::error::CompressionError;
use crate::types::{CompressedImage, RawImageInput};

use super::decode::ImageDecoder;
use super::media_type::{CANONICAL_EXTENSION, CANONICAL_MEDIA_TYPE};

/// Quality steps for the re-encode loop, in integer percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualitySchedule {
    pub initial: u8,
    pub step: u8,
    pub floor: u8,
}

/// The encode the search settled on.
#[derive(Debug)]
pub struct SearchOutcome {
    pub data: Vec<u8>,
    pub quality: u8,
    pub attempts: u32,
}

impl QualitySchedule {
    /// Convert fractional qualities from the config to percent steps.
    pub fn from_config(config: &CompressionConfig) -> Self {
        let percent = |q: f32| (q * 100.0).round().clamp(1.0, 100.0) as u8;
        let initial = percent(config.initial_quality);
        Self {
            initial,
            step: percent(config.quality_step),
            floor: percent(config.min_quality).min(initial),
        }
    }

    /// Encode at decreasing quality until the output fits `target` bytes or
    /// the floor has been tried.
    ///
    /// The quality after each step is clamped to the floor, so the floor is
    /// always the last attempt when nothing fits.
    pub fn search<F, E>(&self, target: u64, mut encode: F) -> Result<SearchOutcome, E>
    where
        F: FnMut(u8) -> Result<Vec<u8>, E>,
    {
        let mut quality = self.initial;
        let mut data = encode(quality)?;
        let mut attempts = 1;

        while data.len() as u64 > target && quality > self.floor {
            quality = quality.saturating_sub(self.step).max(self.floor);
            data = encode(quality)?;
            attempts += 1;
        }

        Ok(SearchOutcome {
            data,
            quality,
            attempts,
        })
    }
}

/// Scale `(width, height)` so the longer side is at most `max_dimension`,
/// preserving aspect ratio. Sizes already within the limit are returned as is.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let scale = max_dimension as f64 / width.max(height) as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
    (scaled(width), scaled(height))
}

/// Replace the file extension with the canonical one.
pub fn canonical_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .with_extension(CANONICAL_EXTENSION)
        .to_string_lossy()
        .into_owned()
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
    }
    Ok(buf)
}

/// Decoded, resized and re-encoded payload.
struct Encoded {
    data: Vec<u8>,
    quality: u8,
    attempts: u32,
    width: u32,
    height: u32,
}

/// Compresses inputs to the canonical format within a byte budget.
pub struct AdaptiveCompressor {
    config: CompressionConfig,
    schedule: QualitySchedule,
    timeout_ms: u64,
}

impl AdaptiveCompressor {
    /// Create a new compressor.
    pub fn new(config: CompressionConfig, pipeline: &PipelineConfig) -> Self {
        Self {
            schedule: QualitySchedule::from_config(&config),
            config,
            timeout_ms: pipeline.compress_timeout_ms,
        }
    }

    /// Whether an input can skip re-encoding entirely.
    pub fn is_fast_path(&self, input: &RawImageInput) -> bool {
        input.len() <= self.config.target_max_bytes
            && input.media_type_str() == CANONICAL_MEDIA_TYPE
    }

    /// Compress an input.
    ///
    /// Small JPEGs are returned byte-identical. Everything else is decoded,
    /// downscaled if needed and re-encoded; any decode or encode failure is
    /// returned for the caller's fallback policy.
    pub async fn compress(&self, input: &RawImageInput) -> Result<CompressedImage, CompressionError> {
        if self.is_fast_path(input) {
            tracing::debug!(
                "{} already within budget ({} bytes), skipping re-encode",
                input.file_name,
                input.len()
            );
            return Ok(CompressedImage::passthrough(input));
        }

        let start = std::time::Instant::now();
        let data = Arc::clone(&input.data);
        let name = input.file_name.clone();
        let config = self.config.clone();
        let schedule = self.schedule;

        let result = timeout(Duration::from_millis(self.timeout_ms), async {
            tokio::task::spawn_blocking(move || Self::compress_sync(&data, &name, &config, schedule))
                .await
        })
        .await;

        let encoded = match result {
            Ok(Ok(encoded)) => encoded?,
            Ok(Err(e)) => {
                return Err(CompressionError::Encode {
                    file_name: input.file_name.clone(),
                    message: format!("Task join error: {}", e),
                })
            }
            Err(_) => {
                return Err(CompressionError::Timeout {
                    file_name: input.file_name.clone(),
                    stage: "compress".to_string(),
                    timeout_ms: self.timeout_ms,
                })
            }
        };

        tracing::debug!(
            "Compressed {}: {} -> {} bytes at q{} ({} attempts, {}x{}) in {:?}",
            input.file_name,
            input.len(),
            encoded.data.len(),
            encoded.quality,
            encoded.attempts,
            encoded.width,
            encoded.height,
            start.elapsed()
        );

        Ok(CompressedImage {
            file_name: canonical_file_name(&input.file_name),
            media_type: CANONICAL_MEDIA_TYPE.to_string(),
            data: encoded.data.into(),
            original_size: input.len(),
            modified_at: Utc::now(),
            quality: Some(encoded.quality),
            width: Some(encoded.width),
            height: Some(encoded.height),
        })
    }

    fn compress_sync(
        data: &[u8],
        file_name: &str,
        config: &CompressionConfig,
        schedule: QualitySchedule,
    ) -> Result<Encoded, CompressionError> {
        let decoded = ImageDecoder::decode_sync(data, file_name)?;

        let (width, height) = fit_within(decoded.width, decoded.height, config.max_dimension);
        let image = if (width, height) != (decoded.width, decoded.height) {
            tracing::trace!(
                "Downscaling {} from {}x{} to {}x{}",
                file_name,
                decoded.width,
                decoded.height,
                width,
                height
            );
            decoded.image.resize_exact(width, height, FilterType::Triangle)
        } else {
            decoded.image
        };
        let rgb = image.to_rgb8();

        let outcome = schedule
            .search(config.target_max_bytes, |quality| encode_jpeg(&rgb, quality))
            .map_err(|e| CompressionError::Encode {
                file_name: file_name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Encoded {
            data: outcome.data,
            quality: outcome.quality,
            attempts: outcome.attempts,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::decode::ImageDecoder;
    use crate::test_support::{encoded, oriented_jpeg, png_input};
    use image::ImageFormat;

    fn compressor(config: CompressionConfig) -> AdaptiveCompressor {
        AdaptiveCompressor::new(config, &PipelineConfig::default())
    }

    #[test]
    fn test_schedule_from_defaults() {
        let schedule = QualitySchedule::from_config(&CompressionConfig::default());
        assert_eq!(
            schedule,
            QualitySchedule {
                initial: 82,
                step: 10,
                floor: 30
            }
        );
    }

    #[test]
    fn test_search_walks_down_to_floor() {
        let schedule = QualitySchedule::from_config(&CompressionConfig::default());
        let mut tried = Vec::new();
        let outcome = schedule
            .search::<_, ()>(10, |q| {
                tried.push(q);
                Ok(vec![0u8; 100])
            })
            .unwrap();

        assert_eq!(tried, vec![82, 72, 62, 52, 42, 32, 30]);
        assert_eq!(outcome.quality, 30);
        // One initial encode plus at most six reductions
        assert_eq!(outcome.attempts, 7);
    }

    #[test]
    fn test_search_stops_once_budget_met() {
        let schedule = QualitySchedule::from_config(&CompressionConfig::default());
        let outcome = schedule
            .search::<_, ()>(1000, |q| Ok(vec![0u8; q as usize * 20]))
            .unwrap();

        // 82*20 > 1000, 72*20 > 1000, 62*20 > 1000, 52*20 > 1000, 42*20 <= 1000
        assert_eq!(outcome.quality, 42);
        assert_eq!(outcome.attempts, 5);
        assert!(outcome.data.len() <= 1000);
    }

    #[test]
    fn test_search_single_attempt_when_first_fits() {
        let schedule = QualitySchedule::from_config(&CompressionConfig::default());
        let outcome = schedule.search::<_, ()>(1000, |_| Ok(vec![1u8; 10])).unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.quality, 82);
    }

    #[test]
    fn test_search_propagates_encode_error() {
        let schedule = QualitySchedule::from_config(&CompressionConfig::default());
        let result = schedule.search(1, |q| if q < 70 { Err("boom") } else { Ok(vec![0u8; 5]) });
        assert_eq!(result.err(), Some("boom"));
    }

    #[test]
    fn test_fit_within_large_landscape() {
        assert_eq!(fit_within(8000, 6000, 3840), (3840, 2880));
        assert_eq!(fit_within(6000, 8000, 3840), (2880, 3840));
    }

    #[test]
    fn test_fit_within_preserves_aspect_ratio() {
        let (w, h) = fit_within(7001, 3333, 3840);
        assert_eq!(w, 3840);
        let expected_h = 3333.0 * 3840.0 / 7001.0;
        assert!((h as f64 - expected_h).abs() <= 1.0);
    }

    #[test]
    fn test_fit_within_leaves_small_images() {
        assert_eq!(fit_within(3840, 2160, 3840), (3840, 2160));
        assert_eq!(fit_within(10, 10, 3840), (10, 10));
        assert_eq!(fit_within(10000, 1, 3840), (3840, 1));
    }

    #[test]
    fn test_canonical_file_name() {
        assert_eq!(canonical_file_name("IMG_1234.HEIC"), "IMG_1234.jpg");
        assert_eq!(canonical_file_name("living.room.png"), "living.room.jpg");
        assert_eq!(canonical_file_name("scan"), "scan.jpg");
    }

    #[tokio::test]
    async fn test_small_jpeg_is_byte_identical() {
        let bytes = encoded(64, 48, ImageFormat::Jpeg);
        let input = RawImageInput::new("door.jpg", Some("image/jpeg".into()), bytes.clone());

        let out = compressor(CompressionConfig::default())
            .compress(&input)
            .await
            .unwrap();

        assert_eq!(&out.data[..], &bytes[..]);
        assert!(Arc::ptr_eq(&out.data, &input.data));
        assert_eq!(out.file_name, "door.jpg");
        assert!(!out.is_reencoded());
    }

    #[tokio::test]
    async fn test_png_is_reencoded_to_jpeg() {
        let input = png_input("window.png", 120, 80);
        let out = compressor(CompressionConfig::default())
            .compress(&input)
            .await
            .unwrap();

        assert_eq!(out.media_type, "image/jpeg");
        assert_eq!(out.file_name, "window.jpg");
        assert_eq!(&out.data[..3], &[0xFF, 0xD8, 0xFF]);
        assert_eq!(out.quality, Some(82));
        assert_eq!(out.original_size, input.len());
        assert_eq!((out.width, out.height), (Some(120), Some(80)));
    }

    #[tokio::test]
    async fn test_oversized_dimensions_are_downscaled() {
        let config = CompressionConfig {
            max_dimension: 64,
            ..Default::default()
        };
        let input = png_input("wall.png", 200, 100);
        let out = compressor(config).compress(&input).await.unwrap();

        let decoded = ImageDecoder::decode_sync(&out.data, "wall.jpg").unwrap();
        assert_eq!((decoded.width, decoded.height), (64, 32));
    }

    #[tokio::test]
    async fn test_reencode_bakes_in_exif_rotation() {
        let config = CompressionConfig {
            target_max_bytes: 10,
            max_dimension: 60,
            ..Default::default()
        };
        let input = RawImageInput::new(
            "sideways.jpg",
            Some("image/jpeg".into()),
            oriented_jpeg(120, 40, 6),
        );
        let out = compressor(config).compress(&input).await.unwrap();

        // Rotated to 40x120 first, then fit to 60 on the long edge
        assert_eq!((out.width, out.height), (Some(20), Some(60)));
        let decoded = ImageDecoder::decode_sync(&out.data, "sideways.jpg").unwrap();
        assert_eq!((decoded.width, decoded.height), (20, 60));
    }

    #[tokio::test]
    async fn test_large_jpeg_reencoded_within_floor() {
        let bytes = encoded(256, 256, ImageFormat::Jpeg);
        let config = CompressionConfig {
            target_max_bytes: 1024,
            ..Default::default()
        };
        let input = RawImageInput::new("floor.jpg", Some("image/jpeg".into()), bytes);
        let out = compressor(config).compress(&input).await.unwrap();

        let quality = out.quality.unwrap();
        assert!(quality >= 30);
        assert!(out.size() <= 1024 || quality == 30);
    }

    #[tokio::test]
    async fn test_undecodable_input_fails() {
        let input = RawImageInput::new(
            "IMG_0002.HEIC",
            Some("image/heic".into()),
            vec![0, 0, 0, 0x18, b'f', b't', b'y', b'p', b'h', b'e', b'i', b'c', 0, 0],
        );
        let err = compressor(CompressionConfig::default())
            .compress(&input)
            .await
            .unwrap_err();
        assert!(matches!(err, CompressionError::Decode { .. }));
    }
}
