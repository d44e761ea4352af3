//! Input stages shared by tagging and duplicate detection.
//!
//! - **decode**: sniff the raster format and decode pixels
//! - **hash**: BLAKE3 content hashes for exact duplicates
//! - **source**: the catalog boundary that lists photos and reads bytes

pub mod decode;
pub mod hash;
pub mod source;

pub use decode::{sniff_format, ImageDecoder, ImageHandle, SniffedFormat};
pub use hash::content_hash_from_bytes;
pub use source::{read_error, DirectorySource, PhotoEntry, PhotoSource};
