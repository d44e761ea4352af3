//! Shared fixtures for integration tests.

#![allow(dead_code)]

use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb, RgbImage};
use phototag_core::config::Normalization;
use phototag_core::features::NormalizedTensor;
use phototag_core::{ClassificationModel, Config, ModelHandle, PipelineError};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Scores each color channel by its mean intensity: red is "sunset", green is
/// "forest", blue is "sky". Expects unit-normalized input.
pub struct ChannelModel {
    labels: Vec<String>,
    input_size: u32,
}

impl ChannelModel {
    pub fn handle(input_size: u32) -> ModelHandle {
        Arc::new(Self {
            labels: vec!["sunset".into(), "forest".into(), "sky".into()],
            input_size,
        })
    }
}

impl ClassificationModel for ChannelModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn forward(&self, tensor: &NormalizedTensor, _path: &Path) -> Result<Vec<f32>, PipelineError> {
        let array = tensor.as_array();
        let plane = (self.input_size * self.input_size) as f32;
        Ok((0..3)
            .map(|c| array.index_axis(ndarray::Axis(1), c).sum() / plane)
            .collect())
    }
}

/// Config suited to [`ChannelModel`].
pub fn channel_config() -> Config {
    let mut config = Config::default();
    config.model.input_size = 32;
    config.model.normalization = Normalization::Unit;
    config
}

/// Brightness strictly rising left to right, with a mild vertical tint.
pub fn rising_gradient(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let v = (x * 255 / (width - 1)) as u8;
        Rgb([v, v, v.saturating_sub((y * 40 / height) as u8)])
    })
}

/// Mirror image of [`rising_gradient`]: brightness falls left to right.
pub fn falling_gradient(width: u32, height: u32) -> RgbImage {
    image::imageops::flip_horizontal(&rising_gradient(width, height))
}

pub fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// Resize by `percentage` (50 = half size).
pub fn resize_image(img: &DynamicImage, percentage: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    img.resize_exact(
        width * percentage / 100,
        height * percentage / 100,
        image::imageops::FilterType::Lanczos3,
    )
}

/// Encode as JPEG with the given quality (1-100).
pub fn jpeg_bytes(img: &DynamicImage, quality: u8) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .expect("JPEG encoding failed");
    buffer.into_inner()
}
