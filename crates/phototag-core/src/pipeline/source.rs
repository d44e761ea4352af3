//! Photo sources: the catalog boundary that supplies identifiers and bytes.
//!
//! The core only needs read access to the bytes of each photo. A catalog
//! backed by a database implements [`PhotoSource`]; [`DirectorySource`] covers
//! the common case of a folder on disk.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::PipelineError;

/// One photo known to a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoEntry {
    /// Caller-defined opaque identifier
    pub id: String,
    /// Location used in error messages and for reading
    pub path: PathBuf,
}

/// Read access to a set of photos.
pub trait PhotoSource: Send + Sync {
    /// All photos in the source, in a stable order.
    fn entries(&self) -> Vec<PhotoEntry>;

    /// Read the raw bytes of one photo.
    fn read(&self, entry: &PhotoEntry) -> std::io::Result<Vec<u8>>;
}

/// Photos found by walking a directory tree.
pub struct DirectorySource {
    root: PathBuf,
    supported_formats: Vec<String>,
}

impl DirectorySource {
    /// Create a source rooted at `root`, keeping files whose extension is in
    /// `config.supported_formats`.
    pub fn new(root: impl Into<PathBuf>, config: &ProcessingConfig) -> Self {
        Self {
            root: root.into(),
            supported_formats: config
                .supported_formats
                .iter()
                .map(|f| f.to_lowercase())
                .collect(),
        }
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.supported_formats.iter().any(|fmt| *fmt == ext_lower)
            })
            .unwrap_or(false)
    }

    fn entry_for(&self, path: &Path) -> PhotoEntry {
        let id = path
            .strip_prefix(&self.root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        PhotoEntry {
            id,
            path: path.to_path_buf(),
        }
    }
}

impl PhotoSource for DirectorySource {
    /// If the root is a file, returns it when supported. If it is a directory,
    /// recursively finds all supported files, sorted by path.
    fn entries(&self) -> Vec<PhotoEntry> {
        if self.root.is_file() {
            if self.is_supported(&self.root) {
                return vec![self.entry_for(&self.root)];
            }
            return vec![];
        }

        let mut entries: Vec<PhotoEntry> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_supported(e.path()))
            .map(|e| self.entry_for(e.path()))
            .collect();

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    fn read(&self, entry: &PhotoEntry) -> std::io::Result<Vec<u8>> {
        std::fs::read(&entry.path)
    }
}

/// Classify a failed [`PhotoSource::read`]: a missing file is
/// `FileNotFound`, anything else makes the photo unusable.
pub fn read_error(path: &Path, e: std::io::Error) -> PipelineError {
    match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::FileNotFound(path.to_path_buf()),
        _ => PipelineError::InvalidImage {
            path: path.to_path_buf(),
            message: format!("Cannot read file: {e}"),
        },
    }
}
