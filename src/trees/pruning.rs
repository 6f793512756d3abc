//! Cost-complexity pruning
//!
//! Weakest-link pruning of a fitted tree. Each step collapses the internal
//! node whose removal costs the least training error per leaf removed, so
//! the tree shrinks through the nested sequence of subtrees that are
//! optimal for increasing values of the complexity penalty alpha.

use super::node::TreeNode;
use crate::data::dataset::{Number, TargetValue};

/// One entry of a prune sequence: a pruned tree together with the smallest
/// penalty at which it becomes preferable to its predecessor.
#[derive(Clone, Debug)]
pub struct PruneStep<XT: Number, YT: TargetValue> {
    pub alpha: f64,
    pub tree: TreeNode<XT, YT>,
}

/// Nested subtrees ordered from the full tree (alpha 0) to a single leaf.
pub type PruneSequence<XT, YT> = Vec<PruneStep<XT, YT>>;

#[derive(Clone, Copy, Debug)]
enum Direction {
    Left,
    Right,
}

struct WeakestLink {
    alpha: f64,
    num_leaves: usize,
    path: Vec<Direction>,
}

/// Produces the full prune sequence for a tree, one collapse per step.
/// Recorded alphas are clamped so they never decrease along the sequence.
pub(crate) fn prune_sequence<XT, YT>(root: &TreeNode<XT, YT>) -> PruneSequence<XT, YT>
where
    XT: Number,
    YT: TargetValue,
{
    let mut current = root.clone();
    let mut sequence = vec![PruneStep {
        alpha: 0.0,
        tree: current.clone(),
    }];
    let mut last_alpha = 0.0;

    while !current.is_leaf() {
        let mut best = None;
        weakest_link(&current, &mut Vec::new(), &mut best);
        let Some(link) = best else { break };

        let alpha = link.alpha.max(last_alpha);
        collapse(&mut current, &link.path);
        sequence.push(PruneStep {
            alpha,
            tree: current.clone(),
        });
        last_alpha = alpha;
    }
    sequence
}

/// Walks the subtree, accumulating each internal node's collapse cost
/// per removed leaf. Returns the subtree's total leaf error and leaf count.
/// Ties on alpha prefer the node with the larger subtree.
fn weakest_link<XT, YT>(
    node: &TreeNode<XT, YT>,
    path: &mut Vec<Direction>,
    best: &mut Option<WeakestLink>,
) -> (f64, usize)
where
    XT: Number,
    YT: TargetValue,
{
    match node {
        TreeNode::Leaf { stats } => (stats.error, 1),
        TreeNode::Split {
            stats, left, right, ..
        } => {
            path.push(Direction::Left);
            let (left_error, left_leaves) = weakest_link(left, path, best);
            path.pop();
            path.push(Direction::Right);
            let (right_error, right_leaves) = weakest_link(right, path, best);
            path.pop();

            let leaf_error = left_error + right_error;
            let num_leaves = left_leaves + right_leaves;
            let alpha = (stats.error - leaf_error) / (num_leaves - 1) as f64;

            let replace = match best {
                None => true,
                Some(current) => {
                    alpha < current.alpha
                        || (alpha == current.alpha && num_leaves > current.num_leaves)
                }
            };
            if replace {
                *best = Some(WeakestLink {
                    alpha,
                    num_leaves,
                    path: path.clone(),
                });
            }
            (leaf_error, num_leaves)
        }
    }
}

fn collapse<XT, YT>(node: &mut TreeNode<XT, YT>, path: &[Direction])
where
    XT: Number,
    YT: TargetValue,
{
    match path.split_first() {
        None => {
            let stats = *node.stats();
            *node = TreeNode::Leaf { stats };
        }
        Some((direction, rest)) => {
            // the path always addresses an internal node of this tree
            if let TreeNode::Split { left, right, .. } = node {
                match direction {
                    Direction::Left => collapse(left, rest),
                    Direction::Right => collapse(right, rest),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::node::NodeStats;

    fn leaf(samples: usize, error: f64, value: i32) -> TreeNode<f64, i32> {
        TreeNode::Leaf {
            stats: NodeStats {
                samples,
                error,
                value,
            },
        }
    }

    fn split(
        threshold: f64,
        stats: NodeStats<i32>,
        left: TreeNode<f64, i32>,
        right: TreeNode<f64, i32>,
    ) -> TreeNode<f64, i32> {
        TreeNode::Split {
            feature_index: 0,
            threshold,
            stats,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn stats(samples: usize, error: f64, value: i32) -> NodeStats<i32> {
        NodeStats {
            samples,
            error,
            value,
        }
    }

    #[test]
    fn test_single_leaf_tree_yields_one_step() {
        let tree = leaf(5, 2.0, 1);
        let sequence = prune_sequence(&tree);
        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence[0].alpha, 0.0);
        assert!(sequence[0].tree.is_leaf());
    }

    #[test]
    fn test_two_leaf_tree_collapses_in_one_step() {
        let tree = split(6.5, stats(4, 1.0, 0), leaf(3, 0.0, 0), leaf(1, 0.0, 1));
        let sequence = prune_sequence(&tree);

        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence[0].alpha, 0.0);
        assert_eq!(sequence[0].tree.num_leaves(), 2);
        assert_eq!(sequence[1].alpha, 1.0);
        assert!(sequence[1].tree.is_leaf());
        assert_eq!(sequence[1].tree.stats().value, 0);
        assert_eq!(sequence[1].tree.stats().error, 1.0);
    }

    #[test]
    fn test_alpha_tie_collapses_larger_subtree() {
        // both internal nodes cost alpha 1; the root has the larger subtree
        let inner = split(2.0, stats(2, 1.0, 0), leaf(1, 0.0, 0), leaf(1, 0.0, 1));
        let tree = split(5.0, stats(4, 2.0, 0), leaf(2, 0.0, 0), inner);

        let sequence = prune_sequence(&tree);
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence[1].alpha, 1.0);
        assert!(sequence[1].tree.is_leaf());
    }

    #[test]
    fn test_deep_chain_prunes_weakest_first() {
        let inner = split(2.5, stats(2, 0.5, 0), leaf(1, 0.0, 0), leaf(1, 0.0, 1));
        let middle = split(1.5, stats(3, 2.0, 0), leaf(1, 0.0, 0), inner);
        let tree = split(6.5, stats(4, 7205.0, 0), middle, leaf(1, 0.0, 1));

        let sequence = prune_sequence(&tree);
        let alphas = sequence.iter().map(|step| step.alpha).collect::<Vec<_>>();
        let leaf_counts = sequence
            .iter()
            .map(|step| step.tree.num_leaves())
            .collect::<Vec<_>>();

        assert_eq!(leaf_counts, vec![4, 3, 2, 1]);
        assert_eq!(alphas, vec![0.0, 0.5, 1.5, 7203.0]);
    }

    #[test]
    fn test_each_step_collapses_exactly_one_node() {
        let left = split(2.0, stats(4, 2.0, 0), leaf(2, 0.5, 0), leaf(2, 0.5, 1));
        let right = split(8.0, stats(4, 1.5, 1), leaf(2, 0.25, 1), leaf(2, 0.25, 0));
        let tree = split(5.0, stats(8, 8.0, 0), left, right);

        let sequence = prune_sequence(&tree);
        let leaf_counts = sequence
            .iter()
            .map(|step| step.tree.num_leaves())
            .collect::<Vec<_>>();
        assert_eq!(leaf_counts, vec![4, 3, 2, 1]);

        for window in sequence.windows(2) {
            assert!(window[0].alpha <= window[1].alpha);
        }
    }
}
