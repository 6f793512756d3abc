use crate::data::dataset::WholeNumber;
use crate::error::MlError;
use nalgebra::{DMatrix, DVector};
use std::collections::HashSet;

type ConfusionMatrix = DMatrix<usize>;

pub trait ClassificationMetrics<T: WholeNumber> {
    /// Computes the confusion matrix based on the true labels and predicted labels.
    ///
    /// Rows are true classes and columns are predicted classes, both in
    /// ascending label order.
    ///
    /// # Errors
    ///
    /// Returns an error if the two vectors have different lengths.
    fn confusion_matrix(
        &self,
        y_true: &DVector<T>,
        y_pred: &DVector<T>,
    ) -> Result<ConfusionMatrix, MlError> {
        if y_true.len() != y_pred.len() {
            return Err(MlError::DimensionMismatch {
                expected: y_true.len(),
                found: y_pred.len(),
            });
        }

        let mut classes_set = HashSet::<T>::new();
        classes_set.extend(y_true);
        classes_set.extend(y_pred);

        let mut classes = Vec::from_iter(classes_set.iter().cloned());
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let mut matrix = DMatrix::zeros(classes.len(), classes.len());

        for (y_t, y_p) in y_true.iter().zip(y_pred.iter()) {
            let matrix_row = classes.iter().position(|&c| c == *y_t).unwrap();
            let matrix_col = classes.iter().position(|&c| c == *y_p).unwrap();
            matrix[(matrix_row, matrix_col)] += 1;
        }

        Ok(matrix)
    }

    /// Fraction of predictions matching the true label.
    fn accuracy(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<f64, MlError> {
        let matrix = self.confusion_matrix(y_true, y_pred)?;

        let correct: usize = matrix.diagonal().iter().sum();

        Ok(correct as f64 / y_true.len() as f64)
    }

    /// Precision of the positive class for binary labels, otherwise the
    /// macro average over classes.
    fn precision(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<f64, MlError> {
        let matrix = self.confusion_matrix(y_true, y_pred)?;

        let num_classes = matrix.nrows();

        if num_classes == 2 {
            let tp = matrix[(1, 1)];
            let fp = matrix[(0, 1)];

            if tp + fp > 0 {
                return Ok(tp as f64 / (tp + fp) as f64);
            }
        }

        let mut precision_total = 0.0;
        for class in 0..num_classes {
            let tp = matrix[(class, class)];
            let fp = matrix.column(class).sum() - tp;

            if tp + fp > 0 {
                precision_total += tp as f64 / (tp + fp) as f64;
            }
        }

        Ok(precision_total / num_classes as f64)
    }

    /// Recall of the positive class for binary labels, otherwise the macro
    /// average over classes.
    fn recall(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<f64, MlError> {
        let matrix = self.confusion_matrix(y_true, y_pred)?;

        let num_classes = matrix.nrows();

        if num_classes == 2 {
            let tp = matrix[(1, 1)];
            let fn_ = matrix[(1, 0)];

            if tp + fn_ > 0 {
                return Ok(tp as f64 / (tp + fn_) as f64);
            }
        }

        let mut recall_total = 0.0;
        for class in 0..num_classes {
            let tp = matrix[(class, class)];
            let fn_ = matrix.row(class).sum() - tp;

            if tp + fn_ > 0 {
                recall_total += tp as f64 / (tp + fn_) as f64;
            }
        }

        Ok(recall_total / num_classes as f64)
    }

    /// Harmonic mean of precision and recall.
    ///
    /// # Errors
    ///
    /// Returns an error when precision and recall are both zero.
    fn f1_score(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<f64, MlError> {
        let precision = self.precision(y_true, y_pred)?;
        let recall = self.recall(y_true, y_pred)?;

        if (precision + recall).abs() < f64::EPSILON {
            return Err(MlError::invalid_input(
                "precision and recall are both 0, the F1 score is undefined",
            ));
        }
        Ok(2.0 * (precision * recall) / (precision + recall))
    }
}
