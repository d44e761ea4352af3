//! Class label files.
//!
//! One label per line, in model output order. Raw class names such as
//! `golden_retriever` are reported as `golden retriever`.

use std::path::Path;

use crate::error::PipelineError;

/// Label file name expected next to the model weights.
pub const LABELS_FILENAME: &str = "labels.txt";

/// Turn a raw class name into a display tag.
pub fn clean_label(raw: &str) -> String {
    raw.trim().replace('_', " ").to_lowercase()
}

/// Parse label file contents. Blank lines are skipped.
pub fn parse_labels(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(clean_label)
        .collect()
}

/// Load and clean labels from disk.
pub fn load_labels(path: &Path) -> Result<Vec<String>, PipelineError> {
    let content = std::fs::read_to_string(path).map_err(|e| PipelineError::ModelLoad {
        path: path.to_path_buf(),
        message: format!("Cannot read labels: {e}"),
    })?;
    let labels = parse_labels(&content);
    if labels.is_empty() {
        return Err(PipelineError::ModelLoad {
            path: path.to_path_buf(),
            message: "Label file contains no classes".to_string(),
        });
    }
    Ok(labels)
}
