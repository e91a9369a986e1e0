//! Thumbnail generation with WebP output.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::config::ThumbnailConfig;

/// Media type of generated thumbnails.
pub const THUMBNAIL_MEDIA_TYPE: &str = "image/webp";

/// Generates gallery thumbnails from decoded photos.
pub struct ThumbnailGenerator {
    config: ThumbnailConfig,
}

impl ThumbnailGenerator {
    /// Create a new thumbnail generator with the given configuration.
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    /// Generate a thumbnail and return the encoded WebP bytes.
    ///
    /// Returns `None` if thumbnail generation is disabled or fails.
    pub fn generate(&self, image: &DynamicImage) -> Option<Vec<u8>> {
        if !self.config.enabled {
            return None;
        }

        // Resize maintaining aspect ratio (longest edge = config.size)
        let thumbnail = image.thumbnail(self.config.size, self.config.size);

        let mut buffer = Cursor::new(Vec::new());
        if let Err(e) = thumbnail.write_to(&mut buffer, ImageFormat::WebP) {
            tracing::debug!("Thumbnail encode failed: {e}");
            return None;
        }
        Some(buffer.into_inner())
    }

    /// Check if thumbnail generation is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}
