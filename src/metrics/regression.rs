use crate::data::dataset::RealNumber;
use crate::error::MlError;
use nalgebra::DVector;

pub trait RegressionMetrics<T: RealNumber> {
    fn mse(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<T, MlError> {
        if y_true.len() != y_pred.len() {
            return Err(MlError::DimensionMismatch {
                expected: y_true.len(),
                found: y_pred.len(),
            });
        }

        let n = T::from_usize(y_true.len())
            .ok_or_else(|| MlError::invalid_input("could not convert the sample count"))?;
        let errors = y_pred - y_true;
        let errors_sq = errors.component_mul(&errors);

        Ok(errors_sq.sum() / n)
    }

    fn mae(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<T, MlError> {
        if y_true.len() != y_pred.len() {
            return Err(MlError::DimensionMismatch {
                expected: y_true.len(),
                found: y_pred.len(),
            });
        }
        let n = T::from_usize(y_true.len())
            .ok_or_else(|| MlError::invalid_input("could not convert the sample count"))?;
        let abs_errors_sum = y_pred
            .iter()
            .zip(y_true.iter())
            .map(|(&y_p, &y_t)| (y_p - y_t).abs())
            .fold(T::zero(), |acc, x| acc + x);

        Ok(abs_errors_sum / n)
    }

    /// Coefficient of determination, one minus the ratio of residual to
    /// total sum of squares.
    fn r2(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<T, MlError> {
        if y_true.len() != y_pred.len() {
            return Err(MlError::DimensionMismatch {
                expected: y_true.len(),
                found: y_pred.len(),
            });
        }
        let n = T::from_usize(y_true.len())
            .ok_or_else(|| MlError::invalid_input("could not convert the sample count"))?;
        let y_true_mean = y_true.sum() / n;

        let ss_res = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&y_t, &y_p)| (y_t - y_p) * (y_t - y_p))
            .fold(T::zero(), |acc, x| acc + x);
        let ss_tot = y_true
            .iter()
            .map(|&y_t| (y_t - y_true_mean) * (y_t - y_true_mean))
            .fold(T::zero(), |acc, x| acc + x);

        if ss_tot == T::zero() {
            return Err(MlError::invalid_input(
                "the true labels are constant, r2 is undefined",
            ));
        }
        Ok(T::one() - ss_res / ss_tot)
    }
}
