//! Image decoding with content-based format detection and timeout support.

use image::metadata::Orientation;
use image::ImageDecoder as _;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::PipelineConfig;
use crate::error::CompressionError;

/// Image decoder with a configurable timeout.
pub struct ImageDecoder {
    timeout_ms: u64,
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Width in pixels after the EXIF orientation was applied
    pub width: u32,
    /// Height in pixels after the EXIF orientation was applied
    pub height: u32,
    /// Encoded payload size in bytes
    pub file_size: u64,
}

impl ImageDecoder {
    /// Create a new decoder using the pipeline timeout.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            timeout_ms: config.compress_timeout_ms,
        }
    }

    /// Decode a payload on the blocking pool, bounded by the timeout.
    pub async fn decode(
        &self,
        data: Arc<[u8]>,
        file_name: &str,
    ) -> Result<DecodedImage, CompressionError> {
        let name = file_name.to_string();
        let decode_result = timeout(Duration::from_millis(self.timeout_ms), async {
            tokio::task::spawn_blocking(move || Self::decode_sync(&data, &name)).await
        })
        .await;

        match decode_result {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(CompressionError::Decode {
                file_name: file_name.to_string(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(CompressionError::Timeout {
                file_name: file_name.to_string(),
                stage: "decode".to_string(),
                timeout_ms: self.timeout_ms,
            }),
        }
    }

    /// Synchronous decode, detecting the format from the content.
    ///
    /// The EXIF orientation is baked into the pixels, so the bitmap is upright.
    pub fn decode_sync(data: &[u8], file_name: &str) -> Result<DecodedImage, CompressionError> {
        let reader = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| CompressionError::Decode {
                file_name: file_name.to_string(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        let format = reader.format().ok_or_else(|| CompressionError::Decode {
            file_name: file_name.to_string(),
            message: "Unrecognized image format".to_string(),
        })?;
        let decode_err = |e: image::ImageError| CompressionError::Decode {
            file_name: file_name.to_string(),
            message: e.to_string(),
        };
        let mut decoder = reader.into_decoder().map_err(decode_err)?;
        // Unreadable orientation tags are treated as upright.
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let mut image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
        image.apply_orientation(orientation);

        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format,
            width,
            height,
            file_size: data.len() as u64,
        })
    }
}
