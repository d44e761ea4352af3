//! Per-photo tagging: decode, preprocess, classify, filter.
//!
//! ```text
//! path → ImageDecoder → preprocess → ModelCache::get_model → classify → ConfidenceFilter
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::cancel::CancelFlag;
use crate::config::Config;
use crate::error::{ConfigError, PipelineError};
use crate::features::{classify, preprocess, InputSpec};
use crate::model::ModelCache;
use crate::pipeline::{ImageDecoder, ImageHandle};
use crate::types::TagResult;

use super::filter::ConfidenceFilter;

/// Tags photos with the shared model.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Tagger {
    cache: Arc<ModelCache>,
    decoder: ImageDecoder,
    input: InputSpec,
    filter: ConfidenceFilter,
}

impl Tagger {
    /// Validates the tagging thresholds up front so a bad configuration fails
    /// before any photo is touched. Does not load the model.
    pub fn new(cache: Arc<ModelCache>, config: &Config) -> Result<Self, ConfigError> {
        let filter = ConfidenceFilter::from_config(&config.tagging)?;
        Ok(Self {
            cache,
            decoder: ImageDecoder::new(config.limits.clone()),
            input: InputSpec::from(&config.model),
            filter,
        })
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    pub fn filter(&self) -> &ConfidenceFilter {
        &self.filter
    }

    /// Tag names for the photo at `path`, best first.
    pub fn tag_photo(&self, path: &Path) -> Result<Vec<String>, PipelineError> {
        self.tag_photo_cancellable(path, &CancelFlag::new())
    }

    /// Same tags as [`tag_photo`](Self::tag_photo), in the same order, paired
    /// with their confidence.
    pub fn tag_photo_with_confidence(
        &self,
        path: &Path,
    ) -> Result<Vec<(String, f32)>, PipelineError> {
        self.tag_photo_with_confidence_cancellable(path, &CancelFlag::new())
    }

    pub fn tag_photo_cancellable(
        &self,
        path: &Path,
        cancel: &CancelFlag,
    ) -> Result<Vec<String>, PipelineError> {
        Ok(self.tag_path(path, cancel)?.names())
    }

    pub fn tag_photo_with_confidence_cancellable(
        &self,
        path: &Path,
        cancel: &CancelFlag,
    ) -> Result<Vec<(String, f32)>, PipelineError> {
        Ok(self.tag_path(path, cancel)?.into_pairs())
    }

    fn tag_path(&self, path: &Path, cancel: &CancelFlag) -> Result<TagResult, PipelineError> {
        cancel.check(path, "decode")?;
        let image = self.decoder.decode_path(path)?;
        self.tag_image(&image, path, cancel)
    }

    /// Tag an image that is already decoded.
    ///
    /// `path` only labels errors and log lines.
    pub fn tag_image(
        &self,
        image: &ImageHandle,
        path: &Path,
        cancel: &CancelFlag,
    ) -> Result<TagResult, PipelineError> {
        cancel.check(path, "preprocess")?;
        let tensor = preprocess(image, &self.input, path)?;

        let model = self.cache.get_model()?;
        cancel.check(path, "inference")?;
        let probs = classify(model.as_ref(), &tensor, path)?;

        let tags = self.filter.apply(&probs);
        tracing::debug!("Tagged {:?}: {:?}", path, tags.names());
        Ok(tags)
    }
}
