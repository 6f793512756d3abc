//! Tree induction
//!
//! The recursive greedy split search shared by the classification and
//! regression trees. The builder works on a private copy of the training
//! data and reorders rows in place, so every node operates on one
//! contiguous row range.

use super::impurity::ImpurityMetric;
use super::node::{NodeStats, TreeNode};
use super::params::TreeParams;
use crate::data::dataset::{Dataset, Number, TargetValue};
use crate::error::MlError;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::cmp::Ordering;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Cooperative cancellation signal for a running fit.
///
/// Cancelling never aborts a build. Nodes not yet expanded when the signal
/// is seen are closed off as leaves over their current samples, so the
/// partial tree stays structurally valid and usable.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug)]
struct SplitCandidate<XT: Number> {
    feature_index: usize,
    threshold: XT,
    error: f64,
    left_samples: usize,
}

pub(crate) struct TreeBuilder<M> {
    params: TreeParams,
    metric: M,
    cancel_token: Option<CancelToken>,
}

impl<M> TreeBuilder<M> {
    pub fn new(params: TreeParams, metric: M) -> Self {
        Self {
            params,
            metric,
            cancel_token: None,
        }
    }

    pub fn with_cancel_token(mut self, cancel_token: CancelToken) -> Self {
        self.cancel_token = Some(cancel_token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
    }

    pub fn build<XT, YT>(&self, dataset: &Dataset<XT, YT>) -> Result<TreeNode<XT, YT>, MlError>
    where
        XT: Number,
        YT: TargetValue,
        M: ImpurityMetric<YT> + Sync,
    {
        if dataset.nrows() == 0 {
            return Err(MlError::invalid_input("the dataset has no samples"));
        }
        if dataset.y.len() != dataset.nrows() {
            return Err(MlError::invalid_input(format!(
                "{} samples but {} labels",
                dataset.nrows(),
                dataset.y.len()
            )));
        }

        let mut working = dataset.clone();
        let num_samples = working.nrows();
        Ok(self.build_node(&mut working, 0..num_samples, 0))
    }

    fn build_node<XT, YT>(
        &self,
        data: &mut Dataset<XT, YT>,
        range: Range<usize>,
        depth: usize,
    ) -> TreeNode<XT, YT>
    where
        XT: Number,
        YT: TargetValue,
        M: ImpurityMetric<YT> + Sync,
    {
        let labels = &data.y.as_slice()[range.start..range.end];
        let (error, value) = self.metric.error_and_value(labels);
        let stats = NodeStats {
            samples: labels.len(),
            error,
            value,
        };

        if self.is_cancelled() || self.should_stop(&stats, depth) {
            return TreeNode::Leaf { stats };
        }

        let Some(best) = self.best_split(data, range.clone()) else {
            return TreeNode::Leaf { stats };
        };

        let parent_error = self
            .metric
            .split_error(&data.y.as_slice()[range.start..range.end]);
        let decrease = (parent_error - best.error) / stats.samples as f64;
        let min_leaf = usize::from(self.params.min_samples_leaf);
        if decrease < self.params.min_impurity_decrease
            || best.left_samples < min_leaf
            || stats.samples - best.left_samples < min_leaf
        {
            return TreeNode::Leaf { stats };
        }

        let split_index =
            data.partition_on_threshold(range.clone(), best.feature_index, best.threshold);
        // a midpoint between adjacent float values can round onto the upper
        // value, which would leave one side empty
        if split_index == range.start || split_index == range.end {
            return TreeNode::Leaf { stats };
        }
        let left = self.build_node(data, range.start..split_index, depth + 1);
        let right = self.build_node(data, split_index..range.end, depth + 1);

        TreeNode::Split {
            feature_index: best.feature_index,
            threshold: best.threshold,
            stats,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn should_stop<YT: TargetValue>(&self, stats: &NodeStats<YT>, depth: usize) -> bool {
        if self
            .params
            .max_depth
            .is_some_and(|max_depth| depth >= usize::from(max_depth))
        {
            return true;
        }
        stats.samples < self.params.min_samples_split.into()
            || stats.error == 0.0
            || stats.samples < 2 * usize::from(self.params.min_samples_leaf)
    }

    /// Best candidate over all features. Features are searched in parallel
    /// and merged with a strict minimum, so ties resolve to the lowest
    /// feature index exactly as a sequential scan would.
    fn best_split<XT, YT>(
        &self,
        data: &Dataset<XT, YT>,
        range: Range<usize>,
    ) -> Option<SplitCandidate<XT>>
    where
        XT: Number,
        YT: TargetValue,
        M: ImpurityMetric<YT> + Sync,
    {
        let candidates = (0..data.ncols())
            .into_par_iter()
            .map(|feature_index| self.best_split_for_feature(data, range.clone(), feature_index))
            .collect::<Vec<_>>();

        candidates
            .into_iter()
            .flatten()
            .fold(None, |best, candidate| match best {
                Some(best) if best.error <= candidate.error => Some(best),
                _ => Some(candidate),
            })
    }

    /// Best candidate threshold on one feature. Thresholds are midpoints of
    /// consecutive distinct sorted values; a constant feature therefore
    /// yields no candidate at all.
    fn best_split_for_feature<XT, YT>(
        &self,
        data: &Dataset<XT, YT>,
        range: Range<usize>,
        feature_index: usize,
    ) -> Option<SplitCandidate<XT>>
    where
        XT: Number,
        YT: TargetValue,
        M: ImpurityMetric<YT>,
    {
        let mut order = range
            .map(|row| (data.x[(row, feature_index)], data.y[row]))
            .collect::<Vec<_>>();
        order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        let labels = order.iter().map(|&(_, label)| label).collect::<Vec<_>>();

        let two = XT::from_usize(2).unwrap();
        let mut best: Option<SplitCandidate<XT>> = None;
        for i in 1..order.len() {
            let lower = order[i - 1].0;
            let upper = order[i].0;
            if lower == upper {
                continue;
            }
            let threshold = lower + (upper - lower) / two;
            let error =
                self.metric.split_error(&labels[..i]) + self.metric.split_error(&labels[i..]);
            if best.as_ref().map_or(true, |best| error < best.error) {
                best = Some(SplitCandidate {
                    feature_index,
                    threshold,
                    error,
                    left_samples: i,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::impurity::{GiniImpurity, SquaredError};
    use nalgebra::{DMatrix, DVector};

    fn four_point_dataset() -> Dataset<f64, i32> {
        let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 10.0]);
        let y = DVector::from_vec(vec![0, 0, 0, 1]);
        Dataset::new(x, y)
    }

    #[test]
    fn test_build_finds_midpoint_threshold() {
        let builder = TreeBuilder::new(TreeParams::new(), GiniImpurity);
        let tree = builder.build(&four_point_dataset()).unwrap();

        match &tree {
            TreeNode::Split {
                feature_index,
                threshold,
                left,
                right,
                ..
            } => {
                assert_eq!(*feature_index, 0);
                assert_eq!(*threshold, 6.5);
                assert_eq!(left.stats().value, 0);
                assert_eq!(right.stats().value, 1);
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }
        assert_eq!(tree.stats().error, 1.0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let x = DMatrix::from_row_slice(
            6,
            2,
            &[1.0, 5.0, 2.0, 4.0, 3.0, 6.0, 8.0, 1.0, 9.0, 2.0, 7.0, 3.0],
        );
        let y = DVector::from_vec(vec![0, 0, 1, 1, 2, 2]);
        let dataset = Dataset::new(x, y);

        let builder = TreeBuilder::new(TreeParams::new(), GiniImpurity);
        let first = builder.build(&dataset).unwrap();
        let second = builder.build(&dataset).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_rejects_empty_dataset() {
        let dataset: Dataset<f64, i32> =
            Dataset::new(DMatrix::zeros(0, 2), DVector::from_vec(vec![]));
        let builder = TreeBuilder::new(TreeParams::new(), GiniImpurity);
        assert!(builder.build(&dataset).is_err());
    }

    #[test]
    fn test_build_rejects_label_mismatch() {
        let dataset = Dataset::new(
            DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]),
            DVector::from_vec(vec![0, 1]),
        );
        let builder = TreeBuilder::new(TreeParams::new(), GiniImpurity);
        assert!(builder.build(&dataset).is_err());
    }

    #[test]
    fn test_single_sample_becomes_leaf() {
        let dataset = Dataset::new(
            DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]),
            DVector::from_vec(vec![4.0]),
        );
        let builder = TreeBuilder::new(TreeParams::new(), SquaredError);
        let tree = builder.build(&dataset).unwrap();
        assert!(tree.is_leaf());
        assert_eq!(tree.stats().value, 4.0);
    }

    #[test]
    fn test_constant_features_become_leaf() {
        let dataset = Dataset::new(
            DMatrix::from_row_slice(4, 2, &[3.0, 7.0, 3.0, 7.0, 3.0, 7.0, 3.0, 7.0]),
            DVector::from_vec(vec![0, 1, 0, 1]),
        );
        let builder = TreeBuilder::new(TreeParams::new(), GiniImpurity);
        let tree = builder.build(&dataset).unwrap();
        assert!(tree.is_leaf());
        assert_eq!(tree.stats().value, 0);
    }

    #[test]
    fn test_min_samples_leaf_rejects_best_split() {
        let mut params = TreeParams::new();
        params.set_min_samples_leaf(2).unwrap();
        let builder = TreeBuilder::new(params, GiniImpurity);
        let tree = builder.build(&four_point_dataset()).unwrap();
        assert!(tree.is_leaf());
    }

    #[test]
    fn test_min_impurity_decrease_rejects_weak_split() {
        let mut params = TreeParams::new();
        params.set_min_impurity_decrease(0.5).unwrap();
        let builder = TreeBuilder::new(params, GiniImpurity);
        let tree = builder.build(&four_point_dataset()).unwrap();
        assert!(tree.is_leaf());

        let mut params = TreeParams::new();
        params.set_min_impurity_decrease(0.3).unwrap();
        let builder = TreeBuilder::new(params, GiniImpurity);
        let tree = builder.build(&four_point_dataset()).unwrap();
        assert!(!tree.is_leaf());
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let x = DMatrix::from_row_slice(8, 1, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let y = DVector::from_vec(vec![0, 1, 2, 3, 4, 5, 6, 7]);
        let dataset = Dataset::new(x, y);

        let mut params = TreeParams::new();
        params.set_max_depth(Some(2)).unwrap();
        let builder = TreeBuilder::new(params, GiniImpurity);
        let tree = builder.build(&dataset).unwrap();
        assert!(tree.depth() <= 2);

        let mut params = TreeParams::new();
        params.set_max_depth(Some(1)).unwrap();
        let builder = TreeBuilder::new(params, GiniImpurity);
        assert_eq!(builder.build(&dataset).unwrap().depth(), 1);
    }

    #[test]
    fn test_cancelled_token_yields_root_leaf() {
        let token = CancelToken::new();
        token.cancel();
        let builder = TreeBuilder::new(TreeParams::new(), GiniImpurity).with_cancel_token(token);
        let tree = builder.build(&four_point_dataset()).unwrap();
        assert!(tree.is_leaf());
        assert_eq!(tree.stats().samples, 4);
        assert_eq!(tree.stats().value, 0);
    }

    #[test]
    fn test_tie_breaks_to_lowest_feature_index() {
        // both columns separate the labels perfectly
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 10.0, 2.0, 20.0, 8.0, 80.0, 9.0, 90.0]);
        let y = DVector::from_vec(vec![0, 0, 1, 1]);
        let dataset = Dataset::new(x, y);

        let builder = TreeBuilder::new(TreeParams::new(), GiniImpurity);
        let tree = builder.build(&dataset).unwrap();
        match tree {
            TreeNode::Split { feature_index, threshold, .. } => {
                assert_eq!(feature_index, 0);
                assert_eq!(threshold, 5.0);
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }
    }
}
