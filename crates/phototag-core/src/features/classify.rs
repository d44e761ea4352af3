//! One forward pass from tensor to per-label probabilities.

use std::path::Path;

use super::NormalizedTensor;
use crate::error::PipelineError;
use crate::model::ClassificationModel;

/// Per-class scores from one inference, in model label order.
///
/// Produced fresh for each call and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector(Vec<(String, f32)>);

impl ProbabilityVector {
    /// Build from `(label, score)` pairs. Scores must lie in [0, 1].
    pub fn new(pairs: Vec<(String, f32)>) -> Self {
        Self(pairs)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(label, score)| (label.as_str(), *score))
    }

    /// Score for `label`, if the model knows it.
    pub fn score(&self, label: &str) -> Option<f32> {
        self.iter().find(|(l, _)| *l == label).map(|(_, s)| s)
    }
}

impl From<Vec<(&str, f32)>> for ProbabilityVector {
    fn from(pairs: Vec<(&str, f32)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(label, score)| (label.to_string(), score))
                .collect(),
        )
    }
}

/// Run `model` on `tensor` and pair each score with its label.
pub fn classify(
    model: &dyn ClassificationModel,
    tensor: &NormalizedTensor,
    path: &Path,
) -> Result<ProbabilityVector, PipelineError> {
    let size = model.input_size() as usize;
    let expected = [1, 3, size, size];
    if tensor.shape() != expected {
        return Err(PipelineError::Inference {
            path: path.to_path_buf(),
            message: format!(
                "Input shape {:?} does not match model input {:?}",
                tensor.shape(),
                expected
            ),
        });
    }

    let start = std::time::Instant::now();
    let scores = model.forward(tensor, path)?;
    tracing::trace!(
        "Forward pass for {:?}: {:.1}ms",
        path,
        start.elapsed().as_secs_f64() * 1000.0
    );

    let labels = model.labels();
    if scores.len() != labels.len() {
        return Err(PipelineError::Inference {
            path: path.to_path_buf(),
            message: format!(
                "Model returned {} scores for {} labels",
                scores.len(),
                labels.len()
            ),
        });
    }
    // Scores are probabilities; NaN fails the range check too.
    if let Some(i) = scores.iter().position(|s| !(0.0..=1.0).contains(s)) {
        return Err(PipelineError::Inference {
            path: path.to_path_buf(),
            message: format!(
                "Score {} for label {:?} is not a probability in [0, 1]",
                scores[i], labels[i]
            ),
        });
    }

    Ok(ProbabilityVector(
        labels.iter().cloned().zip(scores).collect(),
    ))
}
