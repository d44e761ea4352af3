//! PhotoTag Core - photo tagging and near-duplicate detection.
//!
//! PhotoTag organizes a photo library: it classifies each photo into
//! semantic tags with a locally stored model and groups visually similar
//! photos by perceptual fingerprint. It never moves, deletes or uploads
//! anything; results are handed back as plain data.
//!
//! # Architecture
//!
//! ```text
//! bytes → sniff + decode ─┬→ preprocess → classify (shared model) → confidence filter → tags
//!                         └→ fingerprint ─────────→ duplicate detector → groups
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use phototag_core::{Config, ModelCache, Tagger};
//!
//! let config = Config::load()?;
//! let cache = Arc::new(ModelCache::from_config(&config));
//! let tagger = Tagger::new(cache, &config)?;
//!
//! let tags = tagger.tag_photo_with_confidence("./dog.jpg".as_ref())?;
//! // [("dog", 0.93), ("outdoor", 0.81)]
//! ```

// Module declarations
pub mod batch;
pub mod cancel;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod features;
pub mod math;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod tagging;
pub mod types;

// Re-exports for convenient access
pub use batch::{BatchProcessor, BatchProgress};
pub use cancel::CancelFlag;
pub use config::Config;
pub use duplicates::{detect_duplicates, DuplicateDetector, DuplicateGroup, PhotoId};
pub use error::{
    ConfigError, DuplicateError, ErrorKind, PhotoTagError, PipelineError, PipelineResult, Result,
};
pub use features::{Fingerprint, Fingerprinter, ProbabilityVector};
pub use model::{ClassificationModel, ModelCache, ModelHandle, ModelLoader, OnnxLoader};
pub use pipeline::{
    read_error, DirectorySource, ImageDecoder, ImageHandle, PhotoEntry, PhotoSource, SniffedFormat,
};
pub use report::{OutputFormat, ReportWriter};
pub use tagging::{filter, ConfidenceFilter, Tagger};
pub use types::{BatchStats, LibraryReport, PhotoFailure, PhotoRecord, Tag, TagResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
