//! Confidence filtering: turns raw class probabilities into a short, ordered
//! tag list.
//!
//! Scores below the threshold are dropped, repeated labels keep their highest
//! score, the rest are sorted by descending confidence (ties by label) and
//! truncated. An empty result is valid.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::TaggingConfig;
use crate::error::ConfigError;
use crate::features::ProbabilityVector;
use crate::types::{Tag, TagResult};

/// Validated filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceFilter {
    min_confidence: f32,
    max_tags: usize,
}

impl ConfidenceFilter {
    /// Rejects `min_confidence` outside [0, 1] (including NaN) and
    /// `max_tags == 0`. Values are never clamped.
    pub fn new(min_confidence: f32, max_tags: usize) -> Result<Self, ConfigError> {
        TaggingConfig {
            min_confidence,
            max_tags,
        }
        .validate()?;
        Ok(Self {
            min_confidence,
            max_tags,
        })
    }

    pub fn from_config(config: &TaggingConfig) -> Result<Self, ConfigError> {
        Self::new(config.min_confidence, config.max_tags)
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    pub fn max_tags(&self) -> usize {
        self.max_tags
    }

    pub fn apply(&self, probs: &ProbabilityVector) -> TagResult {
        let mut best: HashMap<&str, f32> = HashMap::new();
        for (label, score) in probs.iter() {
            if score < self.min_confidence {
                continue;
            }
            best.entry(label)
                .and_modify(|s| *s = s.max(score))
                .or_insert(score);
        }

        let mut tags: Vec<Tag> = best
            .into_iter()
            .map(|(label, score)| Tag::new(label, score))
            .collect();
        tags.sort_by(by_confidence_then_name);
        tags.truncate(self.max_tags);
        TagResult::from_sorted(tags)
    }
}

fn by_confidence_then_name(a: &Tag, b: &Tag) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.name.cmp(&b.name))
}

/// Filter `probs` in one call. See [`ConfidenceFilter`].
pub fn filter(
    probs: &ProbabilityVector,
    min_confidence: f32,
    max_tags: usize,
) -> Result<TagResult, ConfigError> {
    Ok(ConfidenceFilter::new(min_confidence, max_tags)?.apply(probs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs(pairs: &[(&str, f32)]) -> ProbabilityVector {
        ProbabilityVector::from(pairs.to_vec())
    }

    #[test]
    fn test_threshold_and_order() {
        let p = probs(&[("dog", 0.93), ("cat", 0.40), ("outdoor", 0.81)]);
        let result = filter(&p, 0.5, 5).unwrap();
        assert_eq!(
            result.into_pairs(),
            vec![("dog".to_string(), 0.93), ("outdoor".to_string(), 0.81)]
        );
    }

    #[test]
    fn test_min_confidence_out_of_range_is_config_error() {
        let p = probs(&[("dog", 0.93)]);
        assert!(matches!(
            filter(&p, 1.5, 5),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(filter(&p, -0.1, 5).is_err());
        assert!(filter(&p, f32::NAN, 5).is_err());
    }

    #[test]
    fn test_zero_max_tags_is_config_error() {
        let p = probs(&[("dog", 0.93)]);
        assert!(matches!(
            filter(&p, 0.5, 0),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let p = probs(&[("dog", 0.5), ("cat", 0.4999)]);
        assert_eq!(filter(&p, 0.5, 5).unwrap().names(), vec!["dog"]);
    }

    #[test]
    fn test_truncates_to_top_scores() {
        let p = probs(&[("a", 0.6), ("b", 0.9), ("c", 0.7), ("d", 0.8)]);
        assert_eq!(filter(&p, 0.0, 2).unwrap().names(), vec!["b", "d"]);
    }

    #[test]
    fn test_ties_break_by_label() {
        let p = probs(&[("zebra", 0.7), ("ant", 0.7), ("moth", 0.9)]);
        assert_eq!(
            filter(&p, 0.5, 10).unwrap().names(),
            vec!["moth", "ant", "zebra"]
        );
    }

    #[test]
    fn test_duplicate_labels_keep_highest() {
        let p = probs(&[("dog", 0.6), ("dog", 0.9), ("cat", 0.7)]);
        assert_eq!(
            filter(&p, 0.5, 10).unwrap().into_pairs(),
            vec![("dog".to_string(), 0.9), ("cat".to_string(), 0.7)]
        );
    }

    #[test]
    fn test_nothing_above_threshold_is_empty() {
        let p = probs(&[("dog", 0.2), ("cat", 0.1)]);
        assert!(filter(&p, 0.5, 10).unwrap().is_empty());
    }

    #[test]
    fn test_from_config_defaults() {
        let f = ConfidenceFilter::from_config(&TaggingConfig::default()).unwrap();
        assert_eq!(f.min_confidence(), 0.5);
        assert_eq!(f.max_tags(), 10);
    }
}
