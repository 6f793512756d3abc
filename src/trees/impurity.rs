//! Impurity metrics
//!
//! Heterogeneity measures behind the split search and the pruning errors.
//! A metric is chosen once per tree and fixes three related quantities: the
//! training error a node reports for its own prediction, the objective the
//! split search minimizes, and the loss charged per prediction when a tree
//! is scored on held-out samples.

use crate::data::dataset::{RealNumber, TargetValue, WholeNumber};
use std::collections::HashMap;

pub trait ImpurityMetric<YT: TargetValue> {
    /// The node's training error, summed over the labels, together with the
    /// prediction the node would emit for them.
    fn error_and_value(&self, labels: &[YT]) -> (f64, YT);

    /// The split objective for the labels, summed rather than averaged so
    /// that the two sides of a candidate split can simply be added.
    fn split_error(&self, labels: &[YT]) -> f64;

    /// Error contributed by a single prediction against the true label.
    fn prediction_loss(&self, predicted: YT, actual: YT) -> f64;
}

/// Gini impurity for classification. The split search minimizes the summed
/// Gini of the two sides while node errors count misclassified samples.
#[derive(Clone, Copy, Debug, Default)]
pub struct GiniImpurity;

/// Misclassification counts for classification, used both as the split
/// objective and as the node error.
#[derive(Clone, Copy, Debug, Default)]
pub struct MisclassificationImpurity;

/// Sum of squared deviations about the mean, for regression.
#[derive(Clone, Copy, Debug, Default)]
pub struct SquaredError;

fn label_counts<YT: WholeNumber>(labels: &[YT]) -> HashMap<YT, usize> {
    let mut counts = HashMap::new();
    for label in labels {
        *counts.entry(*label).or_insert(0) += 1;
    }
    counts
}

/// Most frequent label and its count. Ties go to the smallest label so the
/// result does not depend on hash iteration order.
fn majority<YT: WholeNumber>(counts: &HashMap<YT, usize>) -> (YT, usize) {
    let mut best: Option<(YT, usize)> = None;
    for (&label, &count) in counts {
        best = match best {
            Some((best_label, best_count))
                if count < best_count || (count == best_count && best_label < label) =>
            {
                Some((best_label, best_count))
            }
            _ => Some((label, count)),
        };
    }
    best.unwrap_or((YT::zero(), 0))
}

impl<YT: WholeNumber> ImpurityMetric<YT> for GiniImpurity {
    fn error_and_value(&self, labels: &[YT]) -> (f64, YT) {
        let (value, count) = majority(&label_counts(labels));
        ((labels.len() - count) as f64, value)
    }

    fn split_error(&self, labels: &[YT]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        let n = labels.len() as f64;
        let sum_of_squares: f64 = label_counts(labels)
            .values()
            .map(|&count| (count * count) as f64)
            .sum();
        n - sum_of_squares / n
    }

    fn prediction_loss(&self, predicted: YT, actual: YT) -> f64 {
        if predicted == actual {
            0.0
        } else {
            1.0
        }
    }
}

impl<YT: WholeNumber> ImpurityMetric<YT> for MisclassificationImpurity {
    fn error_and_value(&self, labels: &[YT]) -> (f64, YT) {
        let (value, count) = majority(&label_counts(labels));
        ((labels.len() - count) as f64, value)
    }

    fn split_error(&self, labels: &[YT]) -> f64 {
        self.error_and_value(labels).0
    }

    fn prediction_loss(&self, predicted: YT, actual: YT) -> f64 {
        if predicted == actual {
            0.0
        } else {
            1.0
        }
    }
}

impl<YT: RealNumber> ImpurityMetric<YT> for SquaredError {
    fn error_and_value(&self, labels: &[YT]) -> (f64, YT) {
        if labels.is_empty() {
            return (0.0, YT::zero());
        }
        let sum = labels.iter().fold(YT::zero(), |acc, &label| acc + label);
        let mean = sum / YT::from_usize(labels.len()).unwrap();
        let sum_of_squares = labels
            .iter()
            .map(|&label| {
                let deviation = (label - mean).to_f64().unwrap();
                deviation * deviation
            })
            .sum();
        (sum_of_squares, mean)
    }

    fn split_error(&self, labels: &[YT]) -> f64 {
        self.error_and_value(labels).0
    }

    fn prediction_loss(&self, predicted: YT, actual: YT) -> f64 {
        let deviation = (predicted - actual).to_f64().unwrap();
        deviation * deviation
    }
}
