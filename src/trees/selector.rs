//! Automatic pruning by cross-validation
//!
//! Grows an overfitted tree, derives its prune sequence, and scores every
//! candidate subtree with k-fold cross-validation to pick the one that
//! generalizes best. Candidates from different folds are aligned by their
//! position in the prune sequence rather than by alpha, because alpha
//! values depend on the scale of each fold's training errors and are not
//! comparable across folds.

use super::builder::TreeBuilder;
use super::impurity::ImpurityMetric;
use super::node::TreeNode;
use super::params::TreeParams;
use super::pruning::prune_sequence;
use crate::data::dataset::{Dataset, Number, TargetValue};
use crate::error::MlError;
use crate::model_selection::kfold::KFold;
use log::debug;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

pub(crate) fn auto_prune<XT, YT, M>(
    dataset: &Dataset<XT, YT>,
    params: &TreeParams,
    metric: M,
    k_folds: usize,
    use_one_se_rule: bool,
) -> Result<TreeNode<XT, YT>, MlError>
where
    XT: Number,
    YT: TargetValue,
    M: ImpurityMetric<YT> + Copy + Send + Sync,
{
    let builder = TreeBuilder::new(params.clone(), metric);
    let full_tree = builder.build(dataset)?;
    let mut full_sequence = prune_sequence(&full_tree);

    let folds = KFold::new(k_folds)?.split(dataset.nrows())?;

    // per fold: the validation error of every subtree in its prune
    // sequence, plus the validation fold size
    let fold_errors = folds
        .into_par_iter()
        .map(|(train_indices, validation_indices)| {
            let train = dataset.subset(&train_indices);
            let validation = dataset.subset(&validation_indices);
            let tree = builder.build(&train)?;
            let errors = prune_sequence(&tree)
                .iter()
                .map(|step| validation_error(&step.tree, &validation, metric))
                .collect::<Vec<_>>();
            Ok((errors, validation.nrows()))
        })
        .collect::<Result<Vec<_>, MlError>>()?;

    let num_ranks = fold_errors
        .iter()
        .map(|(errors, _)| errors.len())
        .max()
        .unwrap_or(0);
    let total_samples: usize = fold_errors.iter().map(|&(_, size)| size).sum();

    // shorter fold sequences are padded with their most pruned entry
    let mut mean_errors = Vec::with_capacity(num_ranks);
    let mut std_errors = Vec::with_capacity(num_ranks);
    for rank in 0..num_ranks {
        let mut total_error = 0.0;
        let mut fold_means = Vec::with_capacity(fold_errors.len());
        for (errors, size) in &fold_errors {
            let error = errors.get(rank).copied().unwrap_or_else(|| {
                errors.last().copied().unwrap_or(0.0)
            });
            total_error += error;
            fold_means.push(error / *size as f64);
        }
        mean_errors.push(total_error / total_samples as f64);
        std_errors.push(standard_error(&fold_means));
    }

    let best_rank = (0..num_ranks).fold(0, |best, rank| {
        if mean_errors[rank] < mean_errors[best] {
            rank
        } else {
            best
        }
    });
    let selected_rank = if use_one_se_rule {
        let limit = mean_errors[best_rank] + std_errors[best_rank];
        (best_rank..num_ranks)
            .rev()
            .find(|&rank| mean_errors[rank] <= limit)
            .unwrap_or(best_rank)
    } else {
        best_rank
    };

    let index = selected_rank.min(full_sequence.len() - 1);
    debug!(
        "auto prune selected rank {index} of {} (cv error {:.4})",
        full_sequence.len(),
        mean_errors.get(selected_rank).copied().unwrap_or(0.0)
    );
    Ok(full_sequence.swap_remove(index).tree)
}

/// Standard error of the mean of the per-fold error rates.
fn standard_error(fold_means: &[f64]) -> f64 {
    let k = fold_means.len() as f64;
    let grand_mean = fold_means.iter().sum::<f64>() / k;
    let variance = fold_means
        .iter()
        .map(|mean| (mean - grand_mean) * (mean - grand_mean))
        .sum::<f64>()
        / (k - 1.0);
    (variance / k).sqrt()
}

fn validation_error<XT, YT, M>(
    tree: &TreeNode<XT, YT>,
    validation: &Dataset<XT, YT>,
    metric: M,
) -> f64
where
    XT: Number,
    YT: TargetValue,
    M: ImpurityMetric<YT>,
{
    validation
        .x
        .row_iter()
        .zip(validation.y.iter())
        .map(|(row, &actual)| metric.prediction_loss(tree.predict(&row.transpose()), actual))
        .sum()
}
