//! Error types for the PhotoTag pipeline.
//!
//! Errors are organized by stage so every failure carries the offending
//! identifier and can be classified into an [`ErrorKind`] for batch reports.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for PhotoTag operations.
#[derive(Error, Debug)]
pub enum PhotoTagError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Duplicate detection errors
    #[error("Duplicate detection error: {0}")]
    Duplicate(#[from] DuplicateError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image bytes could not be decoded, or decoded to an empty image
    #[error("Invalid image {path}: {message}")]
    InvalidImage { path: PathBuf, message: String },

    /// Magic bytes did not match a supported raster format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Model weights or labels missing, corrupt, or incompatible
    #[error("Model load failed for {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    /// Shape or numeric failure during a forward pass
    #[error("Inference failed for {path}: {message}")]
    Inference { path: PathBuf, message: String },

    /// Processing stopped by an external cancellation signal
    #[error("Cancelled before {stage} for {path}")]
    Cancelled { path: PathBuf, stage: &'static str },
}

impl PipelineError {
    /// Classify this error for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidImage { .. }
            | Self::UnsupportedFormat { .. }
            | Self::FileNotFound(_)
            | Self::FileTooLarge { .. }
            | Self::ImageTooLarge { .. } => ErrorKind::InvalidImage,
            Self::ModelLoad { .. } => ErrorKind::ModelLoad,
            Self::Inference { .. } => ErrorKind::Inference,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether this failure must stop a whole batch rather than a single item.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::ModelLoad)
    }
}

/// Duplicate detection errors.
#[derive(Error, Debug)]
pub enum DuplicateError {
    /// Fingerprints in one snapshot must share a bit width
    #[error("Fingerprint width mismatch for {id}: expected {expected} bits, got {actual}")]
    WidthMismatch {
        id: String,
        expected: u32,
        actual: u32,
    },
}

/// Reportable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidImage,
    ModelLoad,
    Inference,
    Config,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidImage => "invalid_image",
            ErrorKind::ModelLoad => "model_load",
            ErrorKind::Inference => "inference",
            ErrorKind::Config => "config",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Convenience type alias for PhotoTag results.
pub type Result<T> = std::result::Result<T, PhotoTagError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
