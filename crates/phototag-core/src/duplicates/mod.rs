//! Near-duplicate grouping over perceptual fingerprints.
//!
//! Photos are nodes, and two photos are joined when their fingerprints are
//! within `max_distance` bits of each other. Groups are the connected
//! components, so similarity chains: if A~B and B~C then A, B and C share a
//! group even when A and C are far apart.
//!
//! Every input photo lands in exactly one group; unique photos form
//! singletons. Raising `max_distance` can only merge groups.

pub mod bktree;
pub mod union_find;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{DuplicatesConfig, IndexStrategy};
use crate::error::DuplicateError;
use crate::features::Fingerprint;

pub use bktree::BkTree;
pub use union_find::UnionFind;

/// Caller-defined photo identifier.
pub type PhotoId = String;

/// Photos connected by chains of similar fingerprints. Members are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuplicateGroup {
    members: Vec<PhotoId>,
}

impl DuplicateGroup {
    pub fn new(mut members: Vec<PhotoId>) -> Self {
        members.sort();
        Self { members }
    }

    pub fn members(&self) -> &[PhotoId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m == id)
    }
}

/// Groups fingerprints with a fixed distance threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateDetector {
    max_distance: u32,
    index: IndexStrategy,
}

impl DuplicateDetector {
    pub fn new(max_distance: u32, index: IndexStrategy) -> Self {
        Self {
            max_distance,
            index,
        }
    }

    pub fn from_config(config: &DuplicatesConfig) -> Self {
        Self::new(config.max_distance, config.index)
    }

    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    /// Partition `fingerprints` into duplicate groups.
    ///
    /// Groups are ordered by their first (smallest) member. Fingerprints of
    /// different widths are rejected.
    pub fn detect(
        &self,
        fingerprints: &BTreeMap<PhotoId, Fingerprint>,
    ) -> Result<Vec<DuplicateGroup>, DuplicateError> {
        let Some(expected) = fingerprints.values().next().map(Fingerprint::bit_width) else {
            return Ok(Vec::new());
        };
        if let Some((id, fp)) = fingerprints
            .iter()
            .find(|(_, fp)| fp.bit_width() != expected)
        {
            return Err(DuplicateError::WidthMismatch {
                id: id.clone(),
                expected,
                actual: fp.bit_width(),
            });
        }

        // BTreeMap iteration is sorted, so arena index order is id order.
        let ids: Vec<&PhotoId> = fingerprints.keys().collect();
        let items: Vec<&Fingerprint> = fingerprints.values().collect();

        let start = std::time::Instant::now();
        let mut sets = UnionFind::new(items.len());
        match self.index {
            IndexStrategy::Pairwise => {
                for i in 0..items.len() {
                    for j in (i + 1)..items.len() {
                        if items[i].distance(items[j]) <= self.max_distance {
                            sets.union(i, j);
                        }
                    }
                }
            }
            IndexStrategy::BkTree => {
                let tree = BkTree::build(&items);
                for (i, fp) in items.iter().enumerate() {
                    for j in tree.find_within(fp, self.max_distance) {
                        if j != i {
                            sets.union(i, j);
                        }
                    }
                }
            }
        }

        let groups: Vec<DuplicateGroup> = sets
            .sets()
            .into_iter()
            .map(|set| DuplicateGroup {
                members: set.into_iter().map(|i| ids[i].clone()).collect(),
            })
            .collect();

        tracing::debug!(
            "Grouped {} fingerprints into {} groups ({} with duplicates, max_distance={}, {:?}) in {:.1}ms",
            items.len(),
            groups.len(),
            groups.iter().filter(|g| g.len() > 1).count(),
            self.max_distance,
            self.index,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(groups)
    }
}

/// Partition `fingerprints` into duplicate groups using a BK-tree index.
pub fn detect_duplicates(
    fingerprints: &BTreeMap<PhotoId, Fingerprint>,
    max_distance: u32,
) -> Result<Vec<DuplicateGroup>, DuplicateError> {
    DuplicateDetector::new(max_distance, IndexStrategy::BkTree).detect(fingerprints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn fp(value: u64) -> Fingerprint {
        Fingerprint::from_bytes(value.to_be_bytes().to_vec())
    }

    fn snapshot(entries: &[(&str, u64)]) -> BTreeMap<PhotoId, Fingerprint> {
        entries
            .iter()
            .map(|(id, v)| (id.to_string(), fp(*v)))
            .collect()
    }

    fn members(groups: &[DuplicateGroup]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.members().iter().map(String::as_str).collect())
            .collect()
    }

    /// Random fingerprints arranged in loose clusters.
    fn random_snapshot(rng: &mut StdRng, n: usize) -> BTreeMap<PhotoId, Fingerprint> {
        let centers: Vec<u64> = (0..(n / 5).max(1)).map(|_| rng.gen()).collect();
        (0..n)
            .map(|i| {
                let mut value = centers[rng.gen_range(0..centers.len())];
                for _ in 0..rng.gen_range(0..12) {
                    value ^= 1u64 << rng.gen_range(0..64u32);
                }
                (format!("photo-{i:04}"), fp(value))
            })
            .collect()
    }

    /// Whether every group of `fine` lies inside one group of `coarse`.
    fn refines(fine: &[DuplicateGroup], coarse: &[DuplicateGroup]) -> bool {
        fine.iter().all(|g| {
            coarse
                .iter()
                .any(|c| g.members().iter().all(|m| c.contains(m)))
        })
    }

    #[test]
    fn test_empty_input() {
        assert!(detect_duplicates(&BTreeMap::new(), 10).unwrap().is_empty());
    }

    #[test]
    fn test_identical_fingerprints_share_a_group() {
        let snap = snapshot(&[("b", 0xABCD), ("a", 0xABCD), ("c", 0xABCD)]);
        let groups = detect_duplicates(&snap, 0).unwrap();
        assert_eq!(members(&groups), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_far_fingerprint_is_singleton() {
        let snap = snapshot(&[("a", 0), ("b", 0b11), ("c", u64::MAX)]);
        let groups = detect_duplicates(&snap, 10).unwrap();
        assert_eq!(members(&groups), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn test_similarity_chains() {
        // a~b (6 bits), b~c (6 bits), a and c are 12 bits apart.
        let snap = snapshot(&[("a", 0), ("b", 0x3F), ("c", 0xFFF)]);
        assert_eq!(snap["a"].distance(&snap["c"]), 12);
        let groups = detect_duplicates(&snap, 6).unwrap();
        assert_eq!(members(&groups), vec![vec!["a", "b", "c"]]);

        let groups = detect_duplicates(&snap, 5).unwrap();
        assert_eq!(members(&groups), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn test_groups_partition_input() {
        let mut rng = StdRng::seed_from_u64(7);
        let snap = random_snapshot(&mut rng, 200);
        let groups = detect_duplicates(&snap, 8).unwrap();

        let mut seen: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.members().iter().map(String::as_str))
            .collect();
        assert!(groups.iter().all(|g| !g.is_empty()));
        assert!(groups
            .windows(2)
            .all(|w| w[0].members()[0] < w[1].members()[0]));
        seen.sort_unstable();
        let all: Vec<&str> = snap.keys().map(String::as_str).collect();
        assert_eq!(seen, all);
    }

    #[test]
    fn test_bktree_matches_pairwise() {
        let mut rng = StdRng::seed_from_u64(42);
        for round in 0..10 {
            let snap = random_snapshot(&mut rng, 50 + round * 20);
            for max_distance in [0, 3, 10, 20] {
                let tree = DuplicateDetector::new(max_distance, IndexStrategy::BkTree)
                    .detect(&snap)
                    .unwrap();
                let naive = DuplicateDetector::new(max_distance, IndexStrategy::Pairwise)
                    .detect(&snap)
                    .unwrap();
                assert_eq!(tree, naive, "round {round}, max_distance {max_distance}");
            }
        }
    }

    #[test]
    fn test_raising_threshold_only_merges() {
        let mut rng = StdRng::seed_from_u64(1234);
        for _ in 0..10 {
            let snap = random_snapshot(&mut rng, 120);
            let t = rng.gen_range(0..20);
            let d = rng.gen_range(1..10);
            let tight = detect_duplicates(&snap, t).unwrap();
            let loose = detect_duplicates(&snap, t + d).unwrap();
            assert!(loose.len() <= tight.len());
            assert!(refines(&tight, &loose), "t={t}, d={d}");
        }
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let mut snap = snapshot(&[("a", 0), ("b", 1)]);
        snap.insert("c".to_string(), Fingerprint::from_bytes(vec![0; 32]));
        match detect_duplicates(&snap, 10) {
            Err(DuplicateError::WidthMismatch {
                id,
                expected,
                actual,
            }) => {
                assert_eq!(id, "c");
                assert_eq!(expected, 64);
                assert_eq!(actual, 256);
            }
            other => panic!("expected WidthMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_from_config() {
        let detector = DuplicateDetector::from_config(&DuplicatesConfig::default());
        assert_eq!(detector.max_distance(), 10);
    }

    #[test]
    fn test_group_serializes_as_list() {
        let group = DuplicateGroup::new(vec!["b".to_string(), "a".to_string()]);
        assert_eq!(serde_json::to_string(&group).unwrap(), r#"["a","b"]"#);
    }
}
