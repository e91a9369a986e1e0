//! Input validation before processing.

use crate::config::LimitsConfig;
use crate::error::ValidationError;
use crate::types::{RawImageInput, ValidationResult};

use super::media_type::ACCEPTED_MEDIA_TYPES;

/// Validates inputs against their declared type and size.
///
/// Only declared metadata is inspected; the payload is never read.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Validate an input, returning the first rule it breaks.
    ///
    /// Checks, in order:
    /// - Declared type is `image/*` or one of the accepted types
    /// - Declared size is within the ceiling
    /// - Declared size is not zero
    pub fn validate(&self, input: &RawImageInput) -> Result<(), ValidationError> {
        let media_type = input.media_type_str();
        if !media_type.starts_with("image/") && !ACCEPTED_MEDIA_TYPES.contains(&media_type) {
            return Err(ValidationError::UnsupportedType {
                file_name: input.file_name.clone(),
                media_type: media_type.to_string(),
            });
        }

        if input.declared_size > self.limits.max_file_size_bytes() {
            return Err(ValidationError::TooLarge {
                file_name: input.file_name.clone(),
                size_mb: input.declared_size as f64 / (1024.0 * 1024.0),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        if input.declared_size == 0 {
            return Err(ValidationError::Empty {
                file_name: input.file_name.clone(),
            });
        }

        Ok(())
    }

    /// Validate and report as a plain result record.
    pub fn check(&self, input: &RawImageInput) -> ValidationResult {
        match self.validate(input) {
            Ok(()) => ValidationResult {
                valid: true,
                error: None,
            },
            Err(e) => ValidationResult {
                valid: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// The configured size ceiling in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.limits.max_file_size_bytes()
    }
}
