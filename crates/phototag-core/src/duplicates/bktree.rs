//! BK-tree over Hamming space for radius queries.
//!
//! Nodes live in one arena `Vec` and refer to each other by index. Each node
//! stores an item index into the caller's fingerprint slice.

use crate::features::Fingerprint;

#[derive(Debug)]
struct Node {
    item: usize,
    /// `(distance to this node, child node index)`
    children: Vec<(u32, usize)>,
}

/// Metric tree keyed by Hamming distance.
#[derive(Debug)]
pub struct BkTree<'a> {
    items: &'a [&'a Fingerprint],
    nodes: Vec<Node>,
}

impl<'a> BkTree<'a> {
    /// Index every fingerprint in `items`.
    pub fn build(items: &'a [&'a Fingerprint]) -> Self {
        let mut tree = Self {
            items,
            nodes: Vec::with_capacity(items.len()),
        };
        for item in 0..items.len() {
            tree.insert(item);
        }
        tree
    }

    fn insert(&mut self, item: usize) {
        if self.nodes.is_empty() {
            self.nodes.push(Node {
                item,
                children: Vec::new(),
            });
            return;
        }

        let mut current = 0;
        loop {
            let d = self.items[self.nodes[current].item].distance(self.items[item]);
            match self.nodes[current]
                .children
                .iter()
                .find(|(key, _)| *key == d)
            {
                Some(&(_, child)) => current = child,
                None => {
                    let index = self.nodes.len();
                    self.nodes.push(Node {
                        item,
                        children: Vec::new(),
                    });
                    self.nodes[current].children.push((d, index));
                    return;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Item indices within `radius` of `query`, in no particular order.
    pub fn find_within(&self, query: &Fingerprint, radius: u32) -> Vec<usize> {
        let mut found = Vec::new();
        if self.nodes.is_empty() {
            return found;
        }

        let mut stack = vec![0];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            let d = self.items[node.item].distance(query);
            if d <= radius {
                found.push(node.item);
            }
            // Triangle inequality: only children keyed in [d - r, d + r] can match.
            let low = d.saturating_sub(radius);
            let high = d.saturating_add(radius);
            stack.extend(
                node.children
                    .iter()
                    .filter(|(key, _)| (low..=high).contains(key))
                    .map(|&(_, child)| child),
            );
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(value: u64) -> Fingerprint {
        Fingerprint::from_bytes(value.to_be_bytes().to_vec())
    }

    #[test]
    fn test_find_within_matches_linear_scan() {
        let owned: Vec<Fingerprint> = [0u64, 1, 3, 7, 0xFF, 0xFFFF, u64::MAX, 0, 0x0F0F]
            .iter()
            .map(|&v| fp(v))
            .collect();
        let items: Vec<&Fingerprint> = owned.iter().collect();
        let tree = BkTree::build(&items);
        assert_eq!(tree.len(), items.len());

        for query in &owned {
            for radius in [0, 1, 2, 8, 20, 64] {
                let mut got = tree.find_within(query, radius);
                got.sort_unstable();
                let want: Vec<usize> = (0..items.len())
                    .filter(|&i| items[i].distance(query) <= radius)
                    .collect();
                assert_eq!(got, want, "radius {radius}");
            }
        }
    }

    #[test]
    fn test_identical_items_are_all_found() {
        let owned = vec![fp(42), fp(42), fp(42)];
        let items: Vec<&Fingerprint> = owned.iter().collect();
        let tree = BkTree::build(&items);
        let mut got = tree.find_within(&fp(42), 0);
        got.sort_unstable();
        assert_eq!(got, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_tree() {
        let items: Vec<&Fingerprint> = Vec::new();
        let tree = BkTree::build(&items);
        assert!(tree.is_empty());
        assert!(tree.find_within(&fp(0), 64).is_empty());
    }
}
