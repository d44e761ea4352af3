//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.phototag/models"),
        }
    }
}

/// Pixel normalization expected by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Per-channel ImageNet mean/std
    Imagenet,
    /// `pixel / 255` mapped to [-1, 1]
    Symmetric,
    /// `pixel / 255` in [0, 1]
    Unit,
}

/// Activation applied to raw model outputs to obtain class probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Single-label logits
    Softmax,
    /// Multi-label logits
    Sigmoid,
    /// Model already emits probabilities
    Identity,
}

/// Classification model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model directory name under `general.model_dir`
    pub name: String,

    /// Square input resolution in pixels
    pub input_size: u32,

    /// Pixel normalization
    pub normalization: Normalization,

    /// Output activation
    pub activation: Activation,

    /// Output tensor to read; the first output when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "resnet50".to_string(),
            input_size: 224,
            normalization: Normalization::Imagenet,
            activation: Activation::Softmax,
            output_name: None,
        }
    }
}

/// Tagging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Minimum confidence a class needs to become a tag, in [0, 1]
    pub min_confidence: f32,

    /// Maximum number of tags per image
    pub max_tags: usize,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            max_tags: 10,
        }
    }
}

/// Perceptual hash algorithm used for fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintAlgorithm {
    /// Horizontal gradient (dHash)
    Gradient,
    /// Horizontal and vertical gradients at half resolution each
    DoubleGradient,
    /// Cell luminance against the global mean (aHash)
    Mean,
    /// Blockhash.io
    Blockhash,
}

/// Fingerprint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Hash algorithm
    pub algorithm: FingerprintAlgorithm,

    /// Grid edge length. The resulting width also depends on the algorithm,
    /// see [`FingerprintConfig::bit_width`].
    pub hash_size: u32,

    /// Treat an image and its horizontal mirror as the same picture
    pub mirror_invariant: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            algorithm: FingerprintAlgorithm::Gradient,
            hash_size: 8,
            mirror_invariant: false,
        }
    }
}

impl FingerprintConfig {
    /// Number of bits in every fingerprint produced with this configuration.
    ///
    /// Measured from a hasher built with these settings: `double_gradient`
    /// yields fewer bits than `hash_size^2`, and every width is rounded up
    /// to whole bytes.
    pub fn bit_width(&self) -> u32 {
        crate::features::Fingerprinter::new(self).bit_width()
    }
}

/// Neighbour search strategy for duplicate grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStrategy {
    /// BK-tree over Hamming space
    #[default]
    BkTree,
    /// Compare every pair
    Pairwise,
}

/// Duplicate detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicatesConfig {
    /// Largest Hamming distance still counted as a duplicate.
    /// Lower values give fewer false positives and miss more near-duplicates.
    pub max_distance: u32,

    /// Neighbour search strategy
    pub index: IndexStrategy,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            max_distance: 10,
            index: IndexStrategy::BkTree,
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of photos processed concurrently
    pub parallel_workers: usize,

    /// File extensions picked up when scanning a directory
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
