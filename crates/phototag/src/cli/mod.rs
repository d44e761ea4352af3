//! Subcommand implementations.

pub mod config;
pub mod duplicates;
pub mod organize;
pub mod tag;

/// Progress bar drawn on stderr, sized once the photo count is known.
pub(crate) fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    match ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => tracing::debug!("Progress template rejected: {e}"),
    }
    pb.set_message("starting...");
    pb
}
