use crate::node::{Node, NodeStat, NO_PARENT};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A regression tree stored as an arena of nodes indexed by dense ids.
///
/// Nodes `0 .. num_roots` are the roots; prediction starts from the root
/// selected by the caller's group id. Parent and child links are indices
/// into `nodes`, never owning references, so collapsing a split to a leaf
/// simply abandons its subtree in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub stats: Vec<NodeStat>,
    pub num_roots: usize,
}

impl Tree {
    pub fn new(num_roots: usize) -> Self {
        assert!(num_roots >= 1, "a tree must have at least one root");
        let nodes = (0..num_roots).map(|_| Node::new_leaf(NO_PARENT)).collect();
        let stats = vec![NodeStat::default(); num_roots];
        Tree {
            nodes,
            stats,
            num_roots,
        }
    }

    /// Append two fresh leaf placeholders as the children of `nid` and
    /// mark `nid` as an internal node.
    pub fn add_childs(&mut self, nid: usize) {
        let left = self.nodes.len();
        self.nodes.push(Node::new_leaf(nid));
        self.nodes.push(Node::new_leaf(nid));
        self.stats.push(NodeStat::default());
        self.stats.push(NodeStat::default());
        let node = &mut self.nodes[nid];
        node.left_child = left;
        node.right_child = left + 1;
        node.is_leaf = false;
    }

    /// Record the split condition on `nid`. Children are attached
    /// separately with [`Tree::add_childs`].
    pub fn set_split(&mut self, nid: usize, split_feature: u32, split_value: f32, default_left: bool) {
        let node = &mut self.nodes[nid];
        node.split_feature = split_feature;
        node.split_value = split_value;
        node.default_left = default_left;
    }

    /// Collapse `nid` into a leaf with the given weight. The subtree below
    /// it stays allocated but unreferenced.
    pub fn change_to_leaf(&mut self, nid: usize, weight: f32) {
        let node = &mut self.nodes[nid];
        node.is_leaf = true;
        node.leaf_value = weight;
    }

    /// Distance from `nid` to its root.
    pub fn depth(&self, nid: usize) -> usize {
        let mut depth = 0;
        let mut cur = nid;
        while !self.nodes[cur].is_root() {
            cur = self.nodes[cur].parent;
            depth += 1;
        }
        depth
    }

    /// Number of nodes allocated beyond the roots, including any abandoned
    /// by pruning.
    pub fn num_extra_nodes(&self) -> usize {
        self.nodes.len() - self.num_roots
    }

    /// Walk from root `gid` to a leaf, using `unknown[f]` to decide when a
    /// feature value should follow the default direction.
    pub fn get_leaf_index(&self, feat: &[f32], unknown: &[bool], gid: usize) -> usize {
        let mut pid = gid;
        while !self.nodes[pid].is_leaf {
            let node = &self.nodes[pid];
            let f = node.split_feature as usize;
            pid = node.get_child_idx(feat[f], unknown[f]);
        }
        pid
    }

    /// Predict a dense feature vector with a parallel unknown bitmap,
    /// starting from root `gid`.
    pub fn predict_dense(&self, feat: &[f32], unknown: &[bool], gid: usize) -> f32 {
        self.nodes[self.get_leaf_index(feat, unknown, gid)].leaf_value
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            writeln!(f, "{}:{}", i, node)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_on(tree: &mut Tree, nid: usize, feature: u32, value: f32) {
        tree.set_split(nid, feature, value, false);
        tree.add_childs(nid);
    }

    #[test]
    fn test_add_childs_links() {
        let mut tree = Tree::new(1);
        split_on(&mut tree, 0, 0, 1.0);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.stats.len(), 3);
        assert!(!tree.nodes[0].is_leaf);
        assert_eq!(tree.nodes[0].left_child, 1);
        assert_eq!(tree.nodes[0].right_child, 2);
        assert_eq!(tree.nodes[1].parent, 0);
        assert_eq!(tree.nodes[2].parent, 0);
        assert_eq!(tree.num_extra_nodes(), 2);
    }

    #[test]
    fn test_depth() {
        let mut tree = Tree::new(1);
        split_on(&mut tree, 0, 0, 1.0);
        split_on(&mut tree, 2, 0, 2.0);
        assert_eq!(tree.depth(0), 0);
        assert_eq!(tree.depth(1), 1);
        assert_eq!(tree.depth(3), 2);
        assert_eq!(tree.depth(4), 2);
    }

    #[test]
    fn test_change_to_leaf_keeps_subtree_allocated() {
        let mut tree = Tree::new(1);
        split_on(&mut tree, 0, 0, 1.0);
        tree.change_to_leaf(0, 0.25);
        assert!(tree.nodes[0].is_leaf);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.predict_dense(&[5.0], &[false], 0), 0.25);
    }

    #[test]
    fn test_traversal_with_unknowns() {
        let mut tree = Tree::new(1);
        tree.set_split(0, 1, 2.0, true);
        tree.add_childs(0);
        tree.change_to_leaf(1, -1.0);
        tree.change_to_leaf(2, 1.0);
        assert_eq!(tree.predict_dense(&[0.0, 1.0], &[false, false], 0), -1.0);
        assert_eq!(tree.predict_dense(&[0.0, 3.0], &[false, false], 0), 1.0);
        // Unknown split feature goes down the default (left) branch.
        assert_eq!(tree.predict_dense(&[0.0, 9.0], &[false, true], 0), -1.0);
    }

    #[test]
    fn test_multiple_roots() {
        let mut tree = Tree::new(2);
        tree.change_to_leaf(0, 1.0);
        tree.change_to_leaf(1, 2.0);
        assert_eq!(tree.predict_dense(&[], &[], 0), 1.0);
        assert_eq!(tree.predict_dense(&[], &[], 1), 2.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut tree = Tree::new(1);
        split_on(&mut tree, 0, 0, 1.5);
        tree.change_to_leaf(1, -0.5);
        tree.change_to_leaf(2, 0.5);
        let json = serde_json::to_string(&tree).unwrap();
        let back: Tree = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, back);
    }
}
