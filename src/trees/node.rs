//! Tree nodes

use crate::data::dataset::{Number, TargetValue};
use nalgebra::DVector;

/// Aggregate statistics for the training samples that reached a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStats<YT: TargetValue> {
    /// Number of training samples.
    pub samples: usize,
    /// Training error of the node's own prediction, summed over its samples.
    pub error: f64,
    /// The prediction the node emits, majority label or mean.
    pub value: YT,
}

/// One node of a fitted decision tree.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeNode<XT: Number, YT: TargetValue> {
    Split {
        feature_index: usize,
        threshold: XT,
        stats: NodeStats<YT>,
        left: Box<TreeNode<XT, YT>>,
        right: Box<TreeNode<XT, YT>>,
    },
    Leaf {
        stats: NodeStats<YT>,
    },
}

impl<XT: Number, YT: TargetValue> TreeNode<XT, YT> {
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    pub fn stats(&self) -> &NodeStats<YT> {
        match self {
            TreeNode::Split { stats, .. } => stats,
            TreeNode::Leaf { stats } => stats,
        }
    }

    /// Number of leaves in the subtree rooted at this node.
    pub fn num_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.num_leaves() + right.num_leaves(),
        }
    }

    /// Number of nodes in the subtree rooted at this node.
    pub fn num_nodes(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.num_nodes() + right.num_nodes(),
        }
    }

    /// Number of split levels below this node.
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Training error of the subtree's leaves penalized by their number.
    pub fn cost_complexity(&self, alpha: f64) -> f64 {
        self.leaf_error() + alpha * self.num_leaves() as f64
    }

    /// Total training error over the leaves of the subtree.
    pub fn leaf_error(&self) -> f64 {
        match self {
            TreeNode::Leaf { stats } => stats.error,
            TreeNode::Split { left, right, .. } => left.leaf_error() + right.leaf_error(),
        }
    }

    /// Routes one sample down the subtree and returns the reached leaf's
    /// prediction. Samples tied with a threshold go left.
    pub fn predict(&self, features: &DVector<XT>) -> YT {
        match self {
            TreeNode::Leaf { stats } => stats.value,
            TreeNode::Split {
                feature_index,
                threshold,
                left,
                right,
                ..
            } => {
                if features[*feature_index] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(samples: usize, error: f64, value: i32) -> TreeNode<f64, i32> {
        TreeNode::Leaf {
            stats: NodeStats {
                samples,
                error,
                value,
            },
        }
    }

    fn small_tree() -> TreeNode<f64, i32> {
        TreeNode::Split {
            feature_index: 0,
            threshold: 6.5,
            stats: NodeStats {
                samples: 4,
                error: 1.0,
                value: 0,
            },
            left: Box::new(leaf(3, 0.0, 0)),
            right: Box::new(leaf(1, 0.0, 1)),
        }
    }

    #[test]
    fn test_predict_routes_ties_left() {
        let tree = small_tree();
        assert_eq!(tree.predict(&DVector::from_vec(vec![5.0])), 0);
        assert_eq!(tree.predict(&DVector::from_vec(vec![6.5])), 0);
        assert_eq!(tree.predict(&DVector::from_vec(vec![12.0])), 1);
    }

    #[test]
    fn test_subtree_measures() {
        let tree = small_tree();
        assert!(!tree.is_leaf());
        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.leaf_error(), 0.0);
        assert_eq!(tree.stats().error, 1.0);
    }

    // Collapsing the split trades its leaves' zero error for the root's own
    // error of 1, so the costs cross at alpha = 1.
    #[test]
    fn test_cost_complexity_crossover() {
        let tree = small_tree();
        let collapsed = leaf(4, 1.0, 0);

        assert_eq!(tree.cost_complexity(0.0), 0.0);
        assert!(tree.cost_complexity(0.5) < collapsed.cost_complexity(0.5));
        assert_eq!(tree.cost_complexity(1.0), collapsed.cost_complexity(1.0));
        assert!(tree.cost_complexity(2.0) > collapsed.cost_complexity(2.0));
    }
}
