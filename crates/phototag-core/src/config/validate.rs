//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::{Config, FingerprintConfig, TaggingConfig};

/// Smallest and largest supported fingerprint grid (64 to 256 bits).
const MIN_HASH_SIZE: u32 = 8;
const MAX_HASH_SIZE: u32 = 16;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.model.input_size == 0 {
            return Err(ConfigError::ValidationError(
                "model.input_size must be > 0".into(),
            ));
        }
        self.tagging.validate()?;
        self.fingerprint.validate()?;
        if self.duplicates.max_distance > self.fingerprint.bit_width() {
            return Err(ConfigError::ValidationError(format!(
                "duplicates.max_distance must be <= fingerprint width ({} bits)",
                self.fingerprint.bit_width()
            )));
        }
        Ok(())
    }
}

impl TaggingConfig {
    /// Validate the thresholds used by the confidence filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_min_confidence(self.min_confidence)?;
        if self.max_tags == 0 {
            return Err(ConfigError::ValidationError(
                "tagging.max_tags must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl FingerprintConfig {
    /// Validate the fingerprint grid size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_HASH_SIZE..=MAX_HASH_SIZE).contains(&self.hash_size) {
            return Err(ConfigError::ValidationError(format!(
                "fingerprint.hash_size must be between {MIN_HASH_SIZE} and {MAX_HASH_SIZE}"
            )));
        }
        Ok(())
    }
}

/// Reject confidence thresholds outside [0, 1]. NaN is rejected too.
fn validate_min_confidence(min_confidence: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(ConfigError::ValidationError(format!(
            "tagging.min_confidence must be between 0.0 and 1.0 (got {min_confidence})"
        )));
    }
    Ok(())
}
