//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

/// Upper bound for `limits.max_file_size_mb` (1 TiB).
const MAX_FILE_SIZE_MB: u64 = 1024 * 1024;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_FILE_SIZE_MB).contains(&self.limits.max_file_size_mb) {
            return Err(ConfigError::ValidationError(format!(
                "limits.max_file_size_mb must be between 1 and {MAX_FILE_SIZE_MB}"
            )));
        }
        // The marker walk needs at least the SOI marker plus one segment header.
        if self.metadata.scan_bytes < 4 {
            return Err(ConfigError::ValidationError(
                "metadata.scan_bytes must be >= 4".into(),
            ));
        }
        if self.compression.target_max_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "compression.target_max_bytes must be > 0".into(),
            ));
        }
        if self.compression.max_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "compression.max_dimension must be > 0".into(),
            ));
        }
        let c = &self.compression;
        for (name, value) in [
            ("initial_quality", c.initial_quality),
            ("min_quality", c.min_quality),
        ] {
            if !(0.01..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "compression.{name} must be between 0.01 and 1.0"
                )));
            }
        }
        if c.min_quality > c.initial_quality {
            return Err(ConfigError::ValidationError(
                "compression.min_quality must be <= compression.initial_quality".into(),
            ));
        }
        if !(0.01..=1.0).contains(&c.quality_step) {
            return Err(ConfigError::ValidationError(
                "compression.quality_step must be between 0.01 and 1.0".into(),
            ));
        }
        if self.thumbnail.size == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnail.size must be > 0".into(),
            ));
        }
        if self.pipeline.progress_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.progress_buffer must be > 0".into(),
            ));
        }
        if self.pipeline.compress_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.compress_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_max_file_size() {
        let mut config = Config::default();
        config.limits.max_file_size_mb = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_file_size_mb"));
    }

    #[test]
    fn test_validate_rejects_huge_max_file_size() {
        let mut config = Config::default();
        config.limits.max_file_size_mb = u64::MAX / 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_file_size_mb"));

        // Unvalidated values still saturate instead of overflowing
        assert_eq!(config.limits.max_file_size_bytes(), u64::MAX);
    }

    #[test]
    fn test_validate_rejects_tiny_scan_window() {
        let mut config = Config::default();
        config.metadata.scan_bytes = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scan_bytes"));
    }

    #[test]
    fn test_validate_rejects_floor_above_initial_quality() {
        let mut config = Config::default();
        config.compression.min_quality = 0.9;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_quality"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut config = Config::default();
        config.compression.initial_quality = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("initial_quality"));

        let mut config = Config::default();
        config.compression.quality_step = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality_step"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.pipeline.compress_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("compress_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_zero_thumbnail_size() {
        let mut config = Config::default();
        config.thumbnail.size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("thumbnail.size"));
    }
}
