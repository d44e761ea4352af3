//! Image tagging with a closed-vocabulary classifier.
//!
//! The classifier scores every label it knows; the confidence filter keeps
//! the strongest few.

pub mod filter;
pub mod pipeline;

pub use filter::{filter, ConfidenceFilter};
pub use pipeline::Tagger;
