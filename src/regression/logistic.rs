use std::marker::PhantomData;

use crate::{
    data::dataset::{Dataset, RealNumber, WholeNumber},
    error::MlError,
    metrics::classification::ClassificationMetrics,
};
use nalgebra::{DMatrix, DVector};

/// Binary logistic regression trained with gradient descent.
///
/// The first weight is the bias weight. An optional L2 penalty `lambda`
/// shrinks the feature weights, the bias weight is never penalized.
#[derive(Clone, Debug)]
pub struct LogisticRegression<XT: RealNumber, YT: WholeNumber> {
    weights: DVector<XT>,
    lambda: XT,

    _marker: PhantomData<YT>,
}

impl<XT: RealNumber, YT: WholeNumber> Default for LogisticRegression<XT, YT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<XT: RealNumber, YT: WholeNumber> ClassificationMetrics<YT> for LogisticRegression<XT, YT> {}

impl<XT: RealNumber, YT: WholeNumber> LogisticRegression<XT, YT> {
    pub fn new() -> Self {
        Self {
            weights: DVector::<XT>::from_element(3, XT::from_f64(1.0).unwrap()),
            lambda: XT::from_f64(0.0).unwrap(),
            _marker: PhantomData,
        }
    }

    /// Creates a model from a feature dimension, starting weights, or both,
    /// with an optional L2 penalty strength (defaults to 0).
    pub fn with_params(
        dimension: Option<usize>,
        weights: Option<DVector<XT>>,
        lambda: Option<XT>,
    ) -> Result<Self, MlError> {
        let lambda = lambda.unwrap_or_else(|| XT::from_f64(0.0).unwrap());
        if lambda != lambda || lambda < XT::from_f64(0.0).unwrap() {
            return Err(MlError::invalid_input(
                "The regularization strength must be a number greater than or equal to 0.",
            ));
        }

        match (dimension, &weights) {
            (None, None) => Err(MlError::invalid_input(
                "Please input the dimension or starting weights.",
            )),
            (Some(dim), Some(w)) if dim != w.len() - 1 => Err(MlError::invalid_input(
                "The weights should be longer by 1 than the dimension to account for the bias weight.",
            )),
            _ => Ok(Self {
                weights: weights.unwrap_or_else(|| {
                    DVector::<XT>::from_element(dimension.unwrap() + 1, XT::from_f64(1.0).unwrap())
                }),
                lambda,
                _marker: PhantomData,
            }),
        }
    }

    pub fn weights(&self) -> &DVector<XT> {
        &self.weights
    }

    pub fn lambda(&self) -> XT {
        self.lambda
    }

    pub fn predict(&self, x_pred: &DMatrix<XT>) -> Result<DVector<YT>, MlError> {
        if x_pred.ncols() + 1 != self.weights.len() {
            return Err(MlError::DimensionMismatch {
                expected: self.weights.len() - 1,
                found: x_pred.ncols(),
            });
        }
        let x_pred_with_bias = x_pred.clone().insert_column(0, XT::from_f64(1.0).unwrap());

        Ok(self.h(&x_pred_with_bias).map(|val| {
            if val > XT::from_f64(0.5).unwrap() {
                YT::from_usize(1).unwrap()
            } else {
                YT::from_usize(0).unwrap()
            }
        }))
    }

    /// Fits the model with gradient descent until the squared change in
    /// weights drops below `epsilon` or `max_steps` runs out.
    pub fn fit(
        &mut self,
        dataset: &Dataset<XT, YT>,
        lr: XT,
        mut max_steps: usize,
        epsilon: Option<XT>,
        progress: Option<usize>,
    ) -> Result<String, MlError> {
        if progress.is_some_and(|steps| steps == 0) {
            return Err(MlError::invalid_input(
                "The number of steps for progress visualization must be greater than 0.",
            ));
        }
        if !dataset.is_not_empty() {
            return Err(MlError::invalid_input(
                "The dataset has to have at least one sample.",
            ));
        }
        let (x, y) = dataset.into_parts();
        if x.ncols() + 1 != self.weights.len() {
            return Err(MlError::DimensionMismatch {
                expected: self.weights.len() - 1,
                found: x.ncols(),
            });
        }
        if y.iter().any(|&label| label != YT::zero() && label != YT::one()) {
            return Err(MlError::invalid_input("The labels must be binary (0 or 1)."));
        }

        let y_real = y.map(|label| XT::from(label).unwrap());
        let epsilon = epsilon.unwrap_or_else(|| XT::from_f64(1e-6).unwrap());
        let initial_max_steps = max_steps;
        let x_with_bias = x.clone().insert_column(0, XT::from_f64(1.0).unwrap());
        while max_steps > 0 {
            let weights_prev = self.weights.clone();

            let gradient = self.gradient(&x_with_bias, &y_real);

            self.weights -= gradient * lr;

            if progress.is_some_and(|steps| max_steps % steps == 0) {
                log::debug!(
                    "step {}: weights {:?}, cross entropy {}",
                    initial_max_steps - max_steps,
                    self.weights,
                    self.cross_entropy_with_bias(&x_with_bias, &y_real)
                );
            }

            let delta = self
                .weights
                .iter()
                .zip(weights_prev.iter())
                .map(|(&w, &w_prev)| (w - w_prev) * (w - w_prev))
                .fold(XT::from_f64(0.0).unwrap(), |acc, x| acc + x);

            if delta < epsilon {
                return Ok(format!(
                    "Finished training in {} steps.",
                    initial_max_steps - max_steps,
                ));
            }
            max_steps -= 1;
        }
        Ok("Reached maximum steps without converging.".into())
    }

    /// Mean cross entropy of the model on a dataset.
    pub fn cross_entropy(&self, dataset: &Dataset<XT, YT>) -> Result<XT, MlError> {
        let (x, y) = dataset.into_parts();
        if x.ncols() + 1 != self.weights.len() {
            return Err(MlError::DimensionMismatch {
                expected: self.weights.len() - 1,
                found: x.ncols(),
            });
        }

        let x_with_bias = x.clone().insert_column(0, XT::from_f64(1.0).unwrap());
        let y_real = y.map(|label| XT::from(label).unwrap());
        Ok(self.cross_entropy_with_bias(&x_with_bias, &y_real))
    }

    fn cross_entropy_with_bias(&self, x: &DMatrix<XT>, y: &DVector<XT>) -> XT {
        let y_pred = self.h(x);
        let one = XT::from_f64(1.0).unwrap();

        y.iter()
            .zip(y_pred.iter())
            .map(|(&y_i, &y_pred_i)| {
                -y_i * (y_pred_i + XT::from_f64(f64::EPSILON).unwrap()).ln()
                    - (one - y_i) * (one - y_pred_i + XT::from_f64(f64::EPSILON).unwrap()).ln()
            })
            .fold(XT::from_f64(0.0).unwrap(), |acc, x| acc + x)
            / XT::from_usize(y.len()).unwrap()
    }

    fn gradient(&self, x: &DMatrix<XT>, y: &DVector<XT>) -> DVector<XT> {
        let errors = self.h(x) - y;

        let mut penalty = &self.weights * self.lambda;
        penalty[0] = XT::from_f64(0.0).unwrap();

        (x.transpose() * errors + penalty) / XT::from_usize(y.len()).unwrap()
    }

    fn h(&self, x: &DMatrix<XT>) -> DVector<XT> {
        let z = x * &self.weights;
        z.map(|val| Self::sigmoid(val))
    }

    fn sigmoid(z: XT) -> XT {
        let one = XT::from_f64(1.0).unwrap();

        match z {
            z if z < XT::from_f64(-10.0).unwrap() => XT::from_f64(0.0).unwrap(),
            z if z > XT::from_f64(10.0).unwrap() => one,
            _ => one / (one + (-z).exp()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let model = LogisticRegression::<f64, u8>::new();
        assert_eq!(model.weights().len(), 3);
        assert!(model.weights().iter().all(|&w| w == 1.0));
        assert_eq!(model.lambda(), 0.0);
    }

    // Test the creation of a new LogisticRegression model
    #[test]
    fn test_with_dimension() {
        let model = LogisticRegression::<f64, u8>::with_params(Some(3), None, None);
        assert!(model.is_ok());
        assert_eq!(model.as_ref().unwrap().weights().len(), 4);
        assert!(model.unwrap().weights().iter().all(|&w| w == 1.0));
    }

    // Test when only starting weights are provided
    #[test]
    fn test_with_weights() {
        let weights = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let model = LogisticRegression::<f64, u8>::with_params(None, Some(weights.clone()), None);
        assert!(model.is_ok());
        assert_eq!(model.unwrap().weights, weights);
    }

    #[test]
    fn test_with_params_nothing_provided() {
        let model = LogisticRegression::<f64, u8>::with_params(None, None, None);
        assert!(model.is_err());
    }

    // Test when both dimension and starting weights are provided correctly
    #[test]
    fn test_dimension_and_weights_provided_correct() {
        let weights = DVector::from_vec(vec![0.5, -0.5, 1.0]);
        let model =
            LogisticRegression::<f64, u8>::with_params(Some(2), Some(weights.clone()), None);
        assert!(model.is_ok());
        assert_eq!(model.unwrap().weights, weights);
    }

    // Test when both dimension and starting weights are provided incorrectly
    #[test]
    fn test_dimension_and_weights_provided_incorrect() {
        let weights = DVector::from_vec(vec![0.5, -0.5]);
        let model = LogisticRegression::<f64, u8>::with_params(Some(2), Some(weights), None);
        assert!(model.is_err());
    }

    #[test]
    fn test_with_negative_lambda() {
        let model = LogisticRegression::<f64, u8>::with_params(Some(2), None, Some(-0.1));
        assert!(model.is_err());
    }

    #[test]
    fn test_with_nan_lambda() {
        let model = LogisticRegression::<f64, u8>::with_params(Some(2), None, Some(f64::NAN));
        assert!(model.is_err());
    }

    #[test]
    fn test_h_function() {
        let mut model = LogisticRegression::<f64, u8>::with_params(Some(2), None, None).unwrap();

        // Set model weights to known values
        model.weights = DVector::from_vec(vec![0.0, 0.5, -0.5]);

        // Create features for testing
        let features = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);

        // Expected sigmoid values for the given features and weights
        // Sigmoid(0.5*1.0 - 0.5*2.0) and Sigmoid(0.5*3.0 - 0.5*4.0)
        let expected_sigmoid_values = DVector::from_vec(vec![
            1.0 / (1.0 + f64::exp(0.5)),
            1.0 / (1.0 + f64::exp(0.5)),
        ]);
        let features_with_bias = features.clone().insert_column(0, 1.0);
        let predictions = model.h(&features_with_bias);

        for (predicted, expected) in predictions.iter().zip(expected_sigmoid_values.iter()) {
            assert!((predicted - expected).abs() < f64::EPSILON);
        }
    }

    // Test the prediction functionality
    #[test]
    fn test_predict() {
        let model = LogisticRegression::<f64, u8>::with_params(
            None,
            Some(DVector::from_vec(vec![0.0, 0.5, -0.5])),
            None,
        )
        .unwrap();

        let features = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 4.0, 1.0]);
        let predictions = model.predict(&features).unwrap();

        assert_eq!(predictions, DVector::from_vec(vec![0u8, 1]));
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let model = LogisticRegression::<f64, u8>::with_params(Some(2), None, None).unwrap();
        let features = DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]);

        let result = model.predict(&features);
        assert!(matches!(
            result,
            Err(MlError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    // Test sigmoid function

    #[test]
    fn test_sigmoid_less_than_negative_ten() {
        let value = LogisticRegression::<f64, u8>::sigmoid(-10.1);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_sigmoid_zero() {
        let value = LogisticRegression::<f64, u8>::sigmoid(0.0);
        assert!((value - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sigmoid_one() {
        let value = LogisticRegression::<f64, u8>::sigmoid(1.0);
        assert!((value - 0.7310585786300049).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sigmoid_over_ten() {
        let value = LogisticRegression::<f64, u8>::sigmoid(10.1);
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_h() {
        let model = LogisticRegression::<f64, u8>::with_params(
            None,
            Some(DVector::from_vec(vec![0.0, 0.5, -0.5])),
            None,
        )
        .unwrap();
        let features = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 5.0]);
        let features_with_bias = features.clone().insert_column(0, 1.0);
        let value = model.h(&features_with_bias);

        assert!((value[0] - 0.3775406687981454).abs() < f64::EPSILON);
        assert!((value[1] - 0.2689414213699951).abs() < f64::EPSILON);
    }

    // Test cross-entropy calculation
    #[test]
    fn test_cross_entropy() {
        let model = LogisticRegression::<f64, u8>::with_params(
            None,
            Some(DVector::from_vec(vec![0.0, 0.5, -0.5])),
            None,
        )
        .unwrap();

        let dataset = Dataset::new(
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]),
            DVector::from_vec(vec![1u8, 0]),
        );

        let loss = model.cross_entropy(&dataset).unwrap();
        let expected_loss = 0.7240769841801062;

        assert!((loss - expected_loss).abs() < f64::EPSILON);
    }

    #[test]
    fn test_gradient_shape() {
        let model = LogisticRegression::<f64, u8>::new();

        let x = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let y = DVector::from_vec(vec![0.0, 1.0]);

        let gradient = model.gradient(&x, &y);
        assert_eq!(gradient.shape(), (3, 1));
    }

    #[test]
    fn test_gradient_penalty_skips_bias() {
        use approx::assert_relative_eq;

        let regularized =
            LogisticRegression::<f64, u8>::with_params(Some(2), None, Some(2.0)).unwrap();
        let plain = LogisticRegression::<f64, u8>::with_params(Some(2), None, None).unwrap();

        // Both rows activate only the bias weight.
        let x = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let y = DVector::from_vec(vec![0.0, 0.0]);

        let with_penalty = regularized.gradient(&x, &y);
        let without_penalty = plain.gradient(&x, &y);

        assert_relative_eq!(with_penalty[0], without_penalty[0], epsilon = 1e-12);
        assert_relative_eq!(with_penalty[1], without_penalty[1] + 1.0, epsilon = 1e-12);
        assert_relative_eq!(with_penalty[2], without_penalty[2] + 1.0, epsilon = 1e-12);
        assert_relative_eq!(without_penalty[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_separates_classes() {
        let dataset = Dataset::new(
            DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 4.0, 5.0]),
            DVector::from_vec(vec![0u8, 0, 1, 1]),
        );
        let mut model = LogisticRegression::<f64, u8>::with_params(Some(1), None, None).unwrap();

        let result = model.fit(&dataset, 0.5, 2000, Some(1e-12), None);
        assert!(result.is_ok());

        let predictions = model.predict(&dataset.x).unwrap();
        assert_eq!(predictions, dataset.y);
    }

    #[test]
    fn test_fit_with_l2_shrinks_weights() {
        let dataset = Dataset::new(
            DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 4.0, 5.0]),
            DVector::from_vec(vec![0u8, 0, 1, 1]),
        );

        let mut plain = LogisticRegression::<f64, u8>::with_params(Some(1), None, None).unwrap();
        let mut regularized =
            LogisticRegression::<f64, u8>::with_params(Some(1), None, Some(1.0)).unwrap();

        plain.fit(&dataset, 0.5, 500, Some(1e-12), None).unwrap();
        regularized
            .fit(&dataset, 0.5, 500, Some(1e-12), None)
            .unwrap();

        assert!(regularized.weights().norm() < plain.weights().norm());
    }

    #[test]
    fn test_fit_progress_zero() {
        let dataset = Dataset::new(
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]),
            DVector::from_vec(vec![0u8, 1]),
        );
        let mut model = LogisticRegression::<f64, u8>::with_params(Some(2), None, None).unwrap();

        let result = model.fit(&dataset, 0.1, 100, None, Some(0));
        assert!(result.is_err());
    }

    #[test]
    fn test_fit_rejects_non_binary_labels() {
        let dataset = Dataset::new(
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]),
            DVector::from_vec(vec![0u8, 2]),
        );
        let mut model = LogisticRegression::<f64, u8>::with_params(Some(2), None, None).unwrap();

        let result = model.fit(&dataset, 0.1, 100, None, None);
        assert!(result.is_err());
    }
}
