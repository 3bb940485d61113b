//! Owned snapshot of a node in the HNSW graph

use serde::{Deserialize, Serialize};

/// A node in the HNSW graph, copied out of the live link arrays.
///
/// Each node exists on one or more levels. Level 0 contains all nodes.
/// Higher levels contain progressively fewer nodes for "express" navigation.
/// The snapshot does not follow later mutations of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswNode {
    pub docid: u32,

    /// Neighbors at each level
    /// - `levels[0]` = neighbors at level 0 (base, everyone)
    /// - `levels[n]` = neighbors at level n (express, fewer nodes)
    pub levels: Vec<Vec<u32>>,
}

impl HnswNode {
    pub fn new(docid: u32, levels: Vec<Vec<u32>>) -> Self {
        Self { docid, levels }
    }

    /// Highest level this node exists on
    pub fn max_level(&self) -> u32 {
        self.levels.len().saturating_sub(1) as u32
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Neighbors at `level`, empty if the node is not on that level
    pub fn links(&self, level: u32) -> &[u32] {
        self.levels
            .get(level as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_link_to(&self, level: u32, docid: u32) -> bool {
        self.links(level).contains(&docid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_levels() {
        let node = HnswNode::new(42, vec![vec![1, 2], vec![3], vec![]]);
        assert_eq!(node.docid, 42);
        assert_eq!(node.level_count(), 3);
        assert_eq!(node.max_level(), 2);
    }

    #[test]
    fn test_links() {
        let node = HnswNode::new(0, vec![vec![1, 2], vec![3]]);
        assert_eq!(node.links(0), &[1, 2]);
        assert_eq!(node.links(1), &[3]);
        assert_eq!(node.links(5), &[] as &[u32]);
        assert!(node.has_link_to(0, 2));
        assert!(!node.has_link_to(1, 2));
    }
}
