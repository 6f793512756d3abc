use crate::{
    data::dataset::{Dataset, RealNumber},
    error::MlError,
    metrics::regression::RegressionMetrics,
};
use nalgebra::{DMatrix, DVector, RealField};

/// Represents a linear regression model.
///
/// The `LinearRegression` struct implements a linear regression model for predicting a target variable based on one or more input features.
/// It estimates the weights of the linear model in closed form by solving the least squares problem.
///
/// # Type Parameters
///
/// * `T`: The numeric type used for calculations. Must implement the `RealNumber` trait.
///
/// # Fields
///
/// * `weights`: The weights of the linear regression model, with the first being the bias weight.
///
/// # Examples
///
/// ```
/// use ferrite_ml::regression::linear::LinearRegression;
/// use ferrite_ml::data::dataset::Dataset;
/// use nalgebra::{DMatrix, DVector};
///
/// // Fit a model to points lying on the line y = 1 + 2x
/// let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
/// let y = DVector::from_vec(vec![3.0, 5.0, 7.0, 9.0]);
/// let dataset = Dataset::new(x, y);
///
/// let mut model = LinearRegression::<f64>::with_params(Some(1), None).unwrap();
/// let result = model.fit(&dataset);
/// assert!(result.is_ok());
///
/// // Make predictions using the trained model
/// let x_test = DMatrix::from_row_slice(2, 1, &[5.0, 6.0]);
/// let predictions = model.predict(&x_test);
/// assert!(predictions.is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct LinearRegression<T: RealNumber> {
    weights: DVector<T>,
}

impl<T: RealNumber> RegressionMetrics<T> for LinearRegression<T> {}

impl<T: RealNumber> Default for LinearRegression<T> {
    /// Creates a new `LinearRegression` model with default weights.
    ///
    /// The default weights are initialized to 1.0 for each feature, including the bias weight.
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealNumber> LinearRegression<T> {
    /// Creates a new `LinearRegression` model with default weights.
    ///
    /// The default weights are initialized to 1.0 for each feature, including the bias weight.
    pub fn new() -> Self {
        Self {
            weights: DVector::<T>::from_element(3, T::from_f64(1.0).unwrap()),
        }
    }

    /// Creates a new `LinearRegression` model with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `dimension`: The dimension of the input features. If `None`, the dimension will be inferred from the provided weights.
    /// * `weights`: The initial weights for the linear regression model. If `None`, default weights will be used.
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the `LinearRegression` model if the parameters are valid, or an error if the parameters are invalid.
    ///
    /// # Errors
    ///
    /// An error will be returned if:
    /// * Both `dimension` and `weights` are `None`.
    /// * The length of `weights` is not equal to `dimension + 1` to account for the bias weight.
    pub fn with_params(
        dimension: Option<usize>,
        weights: Option<DVector<T>>,
    ) -> Result<Self, MlError> {
        match (dimension, &weights) {
            (None, None) => Err(MlError::invalid_input(
                "Please input the dimension or starting weights.",
            )),
            (Some(dim), Some(w)) if dim != w.len() - 1 => Err(MlError::invalid_input(
                "The weights should be longer by 1 than the dimension to account for the bias weight.",
            )),
            _ => Ok(Self {
                weights: weights.unwrap_or_else(|| {
                    DVector::<T>::from_element(dimension.unwrap() + 1, T::from_f64(1.0).unwrap())
                }),
            }),
        }
    }

    /// Returns a reference to the weights of the linear regression model.
    pub fn weights(&self) -> &DVector<T> {
        &self.weights
    }

    /// Makes predictions using the trained linear regression model.
    ///
    /// # Arguments
    ///
    /// * `x_pred`: The input features for which to make predictions.
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the predicted target values if successful, or an error if the feature width does not match the fitted weights.
    pub fn predict(&self, x_pred: &DMatrix<T>) -> Result<DVector<T>, MlError> {
        if x_pred.ncols() + 1 != self.weights.len() {
            return Err(MlError::DimensionMismatch {
                expected: self.weights.len() - 1,
                found: x_pred.ncols(),
            });
        }
        let x_pred_with_bias = x_pred.clone().insert_column(0, T::from_f64(1.0).unwrap());
        Ok(self.h(&x_pred_with_bias))
    }

    /// Fits the linear regression model to a dataset in a single step.
    ///
    /// A bias column is prepended to the features and the least squares problem
    /// is solved through a singular value decomposition, so rank deficient
    /// inputs still yield the minimum norm solution.
    ///
    /// # Arguments
    ///
    /// * `dataset`: The dataset containing the input features and target values.
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing a success message if fitting is successful, or an error if an error occurs during fitting.
    ///
    /// # Errors
    ///
    /// An error will be returned if:
    /// * The dataset contains no samples.
    /// * The number of labels does not match the number of samples.
    /// * The decomposition cannot produce a solution.
    pub fn fit(&mut self, dataset: &Dataset<T, T>) -> Result<String, MlError>
    where
        T: RealField,
    {
        if !dataset.is_not_empty() {
            return Err(MlError::invalid_input(
                "The dataset has to have at least one sample.",
            ));
        }
        let (x, y) = dataset.into_parts();
        if x.nrows() != y.len() {
            return Err(MlError::invalid_input(
                "The number of labels must match the number of samples.",
            ));
        }

        let x_with_bias = x.clone().insert_column(0, T::from_f64(1.0).unwrap());
        self.weights = x_with_bias
            .svd(true, true)
            .solve(y, T::from_f64(1e-12).unwrap())
            .map_err(MlError::invalid_input)?;

        Ok("Finished fitting the linear model.".into())
    }

    fn h(&self, x: &DMatrix<T>) -> DVector<T> {
        x * &self.weights
    }
}
