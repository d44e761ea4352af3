//! Cooperative cancellation shared between a caller and running work.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::PipelineError;

/// A shared stop signal. Clones observe the same flag.
///
/// Work checks the flag between stages; setting it never interrupts a stage
/// that is already running.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask all holders to stop. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`PipelineError::Cancelled`] if the flag is set.
    pub fn check(&self, path: &Path, stage: &'static str) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            tracing::debug!("Cancelled before {stage}: {:?}", path);
            return Err(PipelineError::Cancelled {
                path: path.to_path_buf(),
                stage,
            });
        }
        Ok(())
    }
}
