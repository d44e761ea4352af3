//! Image decoding with magic-byte format sniffing and size limits.
//!
//! Format dispatch is explicit: [`sniff_format`] maps the first bytes of the
//! input to a [`SniffedFormat`], and only the recognized variants reach the
//! decoder.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Raster format detected from file magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffedFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Unsupported,
}

impl SniffedFormat {
    /// The decoder to use, or `None` for unsupported input.
    fn image_format(self) -> Option<ImageFormat> {
        match self {
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Png => Some(ImageFormat::Png),
            Self::Gif => Some(ImageFormat::Gif),
            Self::WebP => Some(ImageFormat::WebP),
            Self::Unsupported => None,
        }
    }

    /// Lowercase name used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Detect the raster format from the leading bytes of an image.
pub fn sniff_format(header: &[u8]) -> SniffedFormat {
    match header {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => SniffedFormat::Jpeg,
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => SniffedFormat::Png,
        // GIF: GIF87a / GIF89a
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => SniffedFormat::Gif,
        // WebP: RIFF....WEBP
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => SniffedFormat::WebP,
        _ => SniffedFormat::Unsupported,
    }
}

/// Decoded pixel data. Immutable once created.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    image: DynamicImage,
    format: SniffedFormat,
}

impl ImageHandle {
    /// Wrap already-decoded pixels.
    ///
    /// Fails on zero-area images, which no later stage can process.
    pub fn new(
        image: DynamicImage,
        format: SniffedFormat,
        path: &Path,
    ) -> Result<Self, PipelineError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidImage {
                path: path.to_path_buf(),
                message: format!("Image has zero area ({width}x{height})"),
            });
        }
        Ok(Self { image, format })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of colour channels in the decoded buffer.
    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// Raw interleaved pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_bytes()
    }

    /// Format the image was decoded from.
    pub fn format(&self) -> SniffedFormat {
        self.format
    }

    /// Borrow the decoded image.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Image decoder with configurable limits.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Read and decode an image file.
    pub fn decode_path(&self, path: &Path) -> Result<ImageHandle, PipelineError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::FileNotFound(path.to_path_buf()),
            _ => PipelineError::InvalidImage {
                path: path.to_path_buf(),
                message: format!("Cannot read metadata: {e}"),
            },
        })?;
        self.check_file_size(metadata.len(), path)?;

        let bytes = std::fs::read(path).map_err(|e| PipelineError::InvalidImage {
            path: path.to_path_buf(),
            message: format!("Cannot read file: {e}"),
        })?;
        self.decode_bytes(&bytes, path)
    }

    /// Decode an image from an in-memory buffer.
    ///
    /// `path` only identifies the image in errors.
    pub fn decode_bytes(&self, bytes: &[u8], path: &Path) -> Result<ImageHandle, PipelineError> {
        self.check_file_size(bytes.len() as u64, path)?;

        let format = sniff_format(bytes);
        let image_format = format
            .image_format()
            .ok_or_else(|| PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?;

        let image = image::load(Cursor::new(bytes), image_format).map_err(|e| {
            PipelineError::InvalidImage {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        let (width, height) = image.dimensions();
        if width > self.limits.max_image_dimension || height > self.limits.max_image_dimension {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                max_dim: self.limits.max_image_dimension,
            });
        }

        tracing::trace!(
            "Decoded {:?} as {} ({}x{})",
            path,
            format.as_str(),
            width,
            height
        );
        ImageHandle::new(image, format, path)
    }

    fn check_file_size(&self, len: u64, path: &Path) -> Result<(), PipelineError> {
        let max_bytes = self.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        if len > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: len / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }
        if len == 0 {
            return Err(PipelineError::InvalidImage {
                path: path.to_path_buf(),
                message: "File is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{ImageBuffer, Rgb};

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(32, 16, |x, y| {
            Rgb([(x * 8) as u8, (y * 16) as u8, 128])
        }))
    }

    #[test]
    fn test_sniff_jpeg() {
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), SniffedFormat::Jpeg);
    }

    #[test]
    fn test_sniff_png() {
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(sniff_format(&header), SniffedFormat::Png);
    }

    #[test]
    fn test_sniff_webp() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert_eq!(sniff_format(&header), SniffedFormat::WebP);
    }

    #[test]
    fn test_sniff_truncated_riff_is_unsupported() {
        assert_eq!(sniff_format(b"RIFF"), SniffedFormat::Unsupported);
    }

    #[test]
    fn test_sniff_unknown() {
        assert_eq!(sniff_format(b"%PDF-1.7"), SniffedFormat::Unsupported);
        assert_eq!(sniff_format(&[]), SniffedFormat::Unsupported);
    }

    #[test]
    fn test_decode_png_bytes() {
        let bytes = encode(&sample_image(), ImageFormat::Png);
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let handle = decoder.decode_bytes(&bytes, Path::new("a.png")).unwrap();
        assert_eq!(handle.format(), SniffedFormat::Png);
        assert_eq!((handle.width(), handle.height()), (32, 16));
        assert_eq!(handle.channels(), 3);
        assert_eq!(handle.as_bytes().len(), 32 * 16 * 3);
    }

    #[test]
    fn test_format_detected_by_content_not_extension() {
        let bytes = encode(&sample_image(), ImageFormat::Png);
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let handle = decoder.decode_bytes(&bytes, Path::new("misnamed.jpg")).unwrap();
        assert_eq!(handle.format(), SniffedFormat::Png);
    }

    #[test]
    fn test_decode_unsupported_format() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder
            .decode_bytes(b"not an image at all", Path::new("notes.txt"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidImage);
    }

    #[test]
    fn test_decode_truncated_png_is_invalid() {
        let bytes = encode(&sample_image(), ImageFormat::Png);
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder
            .decode_bytes(&bytes[..bytes.len() / 2], Path::new("cut.png"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidImage);
    }

    #[test]
    fn test_decode_empty_input() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder.decode_bytes(&[], Path::new("empty.jpg")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImage { .. }));
    }

    #[test]
    fn test_decode_rejects_oversized_dimensions() {
        let bytes = encode(&sample_image(), ImageFormat::Png);
        let decoder = ImageDecoder::new(LimitsConfig {
            max_image_dimension: 16,
            ..LimitsConfig::default()
        });
        let err = decoder.decode_bytes(&bytes, Path::new("wide.png")).unwrap_err();
        assert!(matches!(err, PipelineError::ImageTooLarge { width: 32, .. }));
    }

    #[test]
    fn test_huge_file_size_limit_does_not_overflow() {
        let bytes = encode(&sample_image(), ImageFormat::Png);
        let decoder = ImageDecoder::new(LimitsConfig {
            max_file_size_mb: u64::MAX,
            ..LimitsConfig::default()
        });
        assert!(decoder.decode_bytes(&bytes, Path::new("a.png")).is_ok());
    }

    #[test]
    fn test_decode_missing_file() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder
            .decode_path(Path::new("/definitely/not/here.jpg"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }

    #[test]
    fn test_decode_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, encode(&sample_image(), ImageFormat::Jpeg)).unwrap();

        let decoder = ImageDecoder::new(LimitsConfig::default());
        let handle = decoder.decode_path(&path).unwrap();
        assert_eq!(handle.format(), SniffedFormat::Jpeg);
    }

    #[test]
    fn test_zero_area_handle_rejected() {
        let err = ImageHandle::new(
            DynamicImage::new_rgb8(0, 10),
            SniffedFormat::Png,
            Path::new("zero.png"),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImage { .. }));
    }
}
