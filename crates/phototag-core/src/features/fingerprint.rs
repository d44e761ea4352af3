//! Perceptual fingerprints for near-duplicate detection.
//!
//! Fingerprints of resized, recompressed or slightly recolored copies of a
//! photo differ in only a few bits, so Hamming distance approximates visual
//! similarity.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{FingerprintAlgorithm, FingerprintConfig};
use crate::pipeline::ImageHandle;

/// Fixed-width bit vector summarizing an image's structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    bytes: Vec<u8>,
}

impl Fingerprint {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bits in the fingerprint.
    pub fn bit_width(&self) -> u32 {
        (self.bytes.len() * 8) as u32
    }

    /// Hamming distance to `other`.
    ///
    /// Both fingerprints must have the same width; extra bytes on either side
    /// count as fully different.
    pub fn distance(&self, other: &Self) -> u32 {
        let common: u32 = self
            .bytes
            .iter()
            .zip(&other.bytes)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let extra = self.bytes.len().abs_diff(other.bytes.len()) as u32 * 8;
        common + extra
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        BASE64.decode(encoded).map(Self::from_bytes)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

fn hash_alg(algorithm: FingerprintAlgorithm) -> HashAlg {
    match algorithm {
        FingerprintAlgorithm::Gradient => HashAlg::Gradient,
        FingerprintAlgorithm::DoubleGradient => HashAlg::DoubleGradient,
        FingerprintAlgorithm::Mean => HashAlg::Mean,
        FingerprintAlgorithm::Blockhash => HashAlg::Blockhash,
    }
}

/// Computes fingerprints with one fixed configuration.
///
/// The hasher is built once and reused for every image.
pub struct Fingerprinter {
    hasher: image_hasher::Hasher,
    mirror_invariant: bool,
    bit_width: u32,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(&FingerprintConfig::default())
    }
}

impl Fingerprinter {
    pub fn new(config: &FingerprintConfig) -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(hash_alg(config.algorithm))
            .hash_size(config.hash_size, config.hash_size)
            .to_hasher();
        let blank = hasher.hash_image(&DynamicImage::new_luma8(64, 64));
        let bit_width = (blank.as_bytes().len() * 8) as u32;
        Self {
            hasher,
            mirror_invariant: config.mirror_invariant,
            bit_width,
        }
    }

    /// Width of every fingerprint this instance produces.
    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Fingerprint a decoded photo.
    pub fn fingerprint(&self, image: &ImageHandle) -> Fingerprint {
        self.fingerprint_image(image.image())
    }

    /// Fingerprint raw pixels.
    pub fn fingerprint_image(&self, image: &DynamicImage) -> Fingerprint {
        let hash = Fingerprint::from_bytes(self.hasher.hash_image(image).as_bytes().to_vec());
        if !self.mirror_invariant {
            return hash;
        }
        let mirrored =
            Fingerprint::from_bytes(self.hasher.hash_image(&image.fliph()).as_bytes().to_vec());
        hash.min(mirrored)
    }
}
