//! ONNX Runtime classifier.
//!
//! A model directory holds `model.onnx` and `labels.txt`. The network takes a
//! `[1, 3, size, size]` tensor and emits one logit per label; the configured
//! activation turns logits into probabilities.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use super::labels::{load_labels, LABELS_FILENAME};
use super::{ClassificationModel, ModelHandle, ModelLoader};
use crate::config::{Activation, Config, ModelConfig};
use crate::error::PipelineError;
use crate::features::NormalizedTensor;

/// Weights file name inside a model directory.
pub const MODEL_FILENAME: &str = "model.onnx";

/// Image classifier backed by an ONNX Runtime session.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    output_name: Option<String>,
    labels: Vec<String>,
    input_size: u32,
    activation: Activation,
}

impl OnnxClassifier {
    /// Load weights and labels from a model directory.
    pub fn load(model_dir: &Path, config: &ModelConfig) -> Result<Self, PipelineError> {
        let weights = model_dir.join(MODEL_FILENAME);
        if !weights.exists() {
            return Err(PipelineError::ModelLoad {
                path: weights,
                message: "Model weights not found".to_string(),
            });
        }
        let labels = load_labels(&model_dir.join(LABELS_FILENAME))?;

        let session = Session::builder()
            .map_err(|e| PipelineError::ModelLoad {
                path: weights.clone(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(&weights)
            .map_err(|e| PipelineError::ModelLoad {
                path: weights.clone(),
                message: format!("Failed to load ONNX model: {e}"),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| PipelineError::ModelLoad {
                path: weights.clone(),
                message: "Model declares no inputs".to_string(),
            })?;

        if let Some(wanted) = &config.output_name {
            if !session.outputs().iter().any(|o| o.name() == wanted.as_str()) {
                return Err(PipelineError::ModelLoad {
                    path: weights,
                    message: format!("Model has no output named {wanted:?}"),
                });
            }
        }

        tracing::debug!(
            "Loaded classifier from {:?} (input: {:?}, outputs: {:?}, {} labels)",
            weights,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>(),
            labels.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name: config.output_name.clone(),
            labels,
            input_size: config.input_size,
            activation: config.activation,
        })
    }
}

impl ClassificationModel for OnnxClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn forward(&self, tensor: &NormalizedTensor, path: &Path) -> Result<Vec<f32>, PipelineError> {
        let inference_error = |message: String| PipelineError::Inference {
            path: path.to_path_buf(),
            message,
        };

        // ort takes the tensor as (shape, flat_data).
        let array = tensor.as_array();
        let shape: Vec<i64> = array.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = array.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| inference_error(format!("Failed to create input tensor: {e}")))?;
        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| inference_error(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| inference_error(format!("ONNX inference failed: {e}")))?;

        let output = match &self.output_name {
            Some(wanted) => outputs.iter().find(|(name, _)| *name == wanted.as_str()),
            None => outputs.iter().next(),
        }
        .ok_or_else(|| inference_error("Model produced no usable output".to_string()))?;

        let (shape, data) = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| inference_error(format!("Failed to extract output tensor: {e}")))?;

        // Logits are [num_classes] or [1, num_classes].
        let mut scores = match shape.len() {
            1 => data.to_vec(),
            2 if shape[0] == 1 => data[..shape[1] as usize].to_vec(),
            _ => {
                return Err(inference_error(format!(
                    "Unexpected output shape: {:?}",
                    shape
                )))
            }
        };

        crate::math::activate_in_place(&mut scores, self.activation);
        Ok(scores)
    }
}

/// Loads the configured ONNX model on first use.
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    model_dir: PathBuf,
    config: ModelConfig,
}

impl OnnxLoader {
    pub fn new(model_dir: impl Into<PathBuf>, config: ModelConfig) -> Self {
        Self {
            model_dir: model_dir.into(),
            config,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.model_path(), config.model.clone())
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

impl ModelLoader for OnnxLoader {
    fn load(&self) -> Result<ModelHandle, PipelineError> {
        let model = OnnxClassifier::load(&self.model_dir, &self.config)?;
        Ok(std::sync::Arc::new(model))
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.config.name, self.model_dir.display())
    }
}
