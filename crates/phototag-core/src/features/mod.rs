//! Feature extraction: classifier input tensors, class probabilities and
//! perceptual fingerprints. Everything here is pure.

pub mod classify;
pub mod fingerprint;
pub mod preprocess;

pub use classify::{classify, ProbabilityVector};
pub use fingerprint::{Fingerprint, Fingerprinter};
pub use preprocess::{preprocess, InputSpec, NormalizedTensor};
