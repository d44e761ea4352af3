//! Core data types produced by the PhotoTag pipeline.
//!
//! These are the records handed to the catalog and the backup collaborator,
//! so everything here serializes with serde.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::duplicates::DuplicateGroup;
use crate::error::{ErrorKind, PipelineError};
use crate::features::Fingerprint;

/// A semantic tag with confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// The tag label (e.g., "dog", "seashore", "golden retriever")
    pub name: String,

    /// Confidence score from 0.0 to 1.0
    pub confidence: f32,
}

impl Tag {
    /// Create a new tag with the given name and confidence.
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Filtered tags for one photo.
///
/// Ordered by descending confidence, ties broken by name ascending, with no
/// repeated names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagResult(Vec<Tag>);

impl TagResult {
    /// Wrap tags that already satisfy the ordering and uniqueness rules.
    pub(crate) fn from_sorted(tags: Vec<Tag>) -> Self {
        Self(tags)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tag names only, in order.
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|t| t.name.clone()).collect()
    }

    /// `(name, confidence)` pairs, in order.
    pub fn into_pairs(self) -> Vec<(String, f32)> {
        self.0.into_iter().map(|t| (t.name, t.confidence)).collect()
    }

    pub fn into_tags(self) -> Vec<Tag> {
        self.0
    }
}

/// Everything computed for one successfully processed photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Caller-supplied identifier
    pub id: String,

    /// Where the bytes were read from
    pub path: PathBuf,

    /// BLAKE3 hash of the file bytes, for exact duplicates
    pub content_hash: String,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Sniffed format ("jpeg", "png", "gif", "webp")
    pub format: String,

    /// Perceptual fingerprint, base64 encoded
    pub fingerprint: Fingerprint,

    /// Semantic tags with confidence scores
    pub tags: Vec<Tag>,
}

/// A photo that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoFailure {
    pub id: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl PhotoFailure {
    pub fn from_error(id: impl Into<String>, error: &PipelineError) -> Self {
        Self {
            id: id.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Processing statistics for a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Photos listed by the source
    pub total: usize,

    /// Photos processed successfully
    pub succeeded: usize,

    /// Photos that failed (including cancelled ones)
    pub failed: usize,

    /// Duplicate groups with more than one member
    pub duplicate_sets: usize,

    /// Processing rate in photos per second
    pub photos_per_second: f64,

    /// Total processing time in seconds
    pub total_seconds: f64,
}

/// The result of organizing a library: tags, duplicate groups and failures.
///
/// This is the artifact handed to the backup collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryReport {
    /// Successfully processed photos, sorted by id
    pub photos: Vec<PhotoRecord>,

    /// Partition of `photos` into duplicate groups
    pub duplicate_groups: Vec<DuplicateGroup>,

    /// Photos that failed, sorted by id
    pub failures: Vec<PhotoFailure>,

    pub stats: BatchStats,

    /// Whether the run was stopped early
    pub cancelled: bool,
}

impl LibraryReport {
    /// Groups that actually contain duplicates.
    pub fn duplicate_sets(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.duplicate_groups.iter().filter(|g| g.len() > 1)
    }
}
