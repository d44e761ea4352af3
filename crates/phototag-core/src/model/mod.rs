//! Classification models and the process-wide model cache.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use phototag_core::{Config, ModelCache};
//!
//! let config = Config::default();
//! let cache = Arc::new(ModelCache::from_config(&config));
//! let model = cache.get_model()?; // loads once
//! let again = cache.get_model()?; // same instance
//! assert!(Arc::ptr_eq(&model, &again));
//! ```

pub mod cache;
pub mod labels;
pub mod onnx;

use std::path::Path;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::features::NormalizedTensor;

pub use cache::{ModelCache, ModelLoader};
pub use onnx::{OnnxClassifier, OnnxLoader};

/// A loaded image classifier.
///
/// Implementations must be safe to call from many workers at once: either
/// stateless per call or synchronized internally. [`OnnxClassifier`] holds its
/// session behind a `Mutex`, so concurrent forward passes are serialized.
pub trait ClassificationModel: Send + Sync {
    /// Class labels, in output order.
    fn labels(&self) -> &[String];

    /// Square input resolution the model was exported with.
    fn input_size(&self) -> u32;

    /// Run one forward pass and return one probability per label.
    fn forward(&self, tensor: &NormalizedTensor, path: &Path) -> Result<Vec<f32>, PipelineError>;
}

/// Shared, read-only reference to the one loaded model.
pub type ModelHandle = Arc<dyn ClassificationModel>;
