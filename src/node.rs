use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Parent id carried by root nodes.
pub const NO_PARENT: usize = usize::MAX;

/// One node of a regression tree. A node starts life as a leaf
/// placeholder and becomes a split once a feature, threshold and children
/// are recorded on it; collapsing a split back to a leaf only flips
/// `is_leaf` and sets the weight, leaving its subtree allocated but
/// unreferenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub parent: usize,
    pub left_child: usize,
    pub right_child: usize,
    pub split_feature: u32,
    pub split_value: f32,
    pub default_left: bool,
    pub leaf_value: f32,
    pub is_leaf: bool,
}

impl Node {
    pub fn new_leaf(parent: usize) -> Self {
        Node {
            parent,
            left_child: 0,
            right_child: 0,
            split_feature: 0,
            split_value: 0.0,
            default_left: false,
            leaf_value: 0.0,
            is_leaf: true,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent == NO_PARENT
    }

    /// The child an instance travels to, given the value of the split
    /// feature and whether it is unknown for this instance.
    pub fn get_child_idx(&self, fvalue: f32, is_unknown: bool) -> usize {
        if is_unknown {
            if self.default_left {
                self.left_child
            } else {
                self.right_child
            }
        } else if fvalue < self.split_value {
            self.left_child
        } else {
            self.right_child
        }
    }
}

/// Training statistics kept for each node while a tree is grown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStat {
    /// Loss reduction realized by this node's split.
    pub loss_chg: f32,
    /// The leaf weight this node would emit if collapsed.
    pub base_weight: f32,
    /// Number of direct children known to be leaves, up to now.
    pub leaf_child_cnt: i32,
}

impl Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_leaf {
            write!(f, "leaf={}", self.leaf_value)
        } else {
            write!(
                f,
                "[f{} < {}] yes={},no={},missing={}",
                self.split_feature,
                self.split_value,
                self.left_child,
                self.right_child,
                if self.default_left { self.left_child } else { self.right_child },
            )
        }
    }
}
