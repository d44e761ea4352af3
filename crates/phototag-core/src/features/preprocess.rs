//! Image preprocessing for classifier inference.
//!
//! Produces an NCHW `[1, 3, size, size]` tensor of RGB values normalized the
//! way the model was trained.

use image::imageops::FilterType;
use ndarray::Array4;
use std::path::Path;

use crate::config::{ModelConfig, Normalization};
use crate::error::PipelineError;
use crate::pipeline::ImageHandle;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// ImageNet per-channel mean and std (RGB order).
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// What the model expects as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    /// Square input resolution in pixels
    pub size: u32,
    pub normalization: Normalization,
}

impl From<&ModelConfig> for InputSpec {
    fn from(config: &ModelConfig) -> Self {
        Self {
            size: config.input_size,
            normalization: config.normalization,
        }
    }
}

/// A preprocessed image ready for a forward pass.
#[derive(Debug, Clone)]
pub struct NormalizedTensor(Array4<f32>);

impl NormalizedTensor {
    /// Tensor shape as `[batch, channels, height, width]`.
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }
}

impl From<Array4<f32>> for NormalizedTensor {
    fn from(array: Array4<f32>) -> Self {
        Self(array)
    }
}

/// Map an 8-bit channel value into the model's numeric range.
fn normalize(value: u8, channel: usize, normalization: Normalization) -> f32 {
    let unit = value as f32 / 255.0;
    match normalization {
        Normalization::Imagenet => (unit - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel],
        Normalization::Symmetric => (unit - 0.5) / 0.5,
        Normalization::Unit => unit,
    }
}

/// Resize, convert to RGB, and normalize an image into an input tensor.
pub fn preprocess(
    image: &ImageHandle,
    spec: &InputSpec,
    path: &Path,
) -> Result<NormalizedTensor, PipelineError> {
    if image.width() == 0 || image.height() == 0 || spec.size == 0 {
        return Err(PipelineError::InvalidImage {
            path: path.to_path_buf(),
            message: "Cannot preprocess an image with zero area".to_string(),
        });
    }

    let resized = image
        .image()
        .resize_exact(spec.size, spec.size, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let size = spec.size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    // Write through the raw slice to avoid 4D index bounds checks per pixel.
    let plane = size * size;
    let tensor_data = tensor
        .as_slice_mut()
        .ok_or_else(|| PipelineError::Inference {
            path: path.to_path_buf(),
            message: "Input tensor is not contiguous".to_string(),
        })?;
    for (i, pixel) in rgb.as_raw().chunks_exact(CHANNELS).enumerate() {
        for (c, &val) in pixel.iter().enumerate() {
            // NCHW layout: offset = c * size * size + y * size + x
            tensor_data[c * plane + i] = normalize(val, c, spec.normalization);
        }
    }

    Ok(NormalizedTensor(tensor))
}
