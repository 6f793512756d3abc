//! Decision Tree Regressor
use super::builder::{CancelToken, TreeBuilder};
use super::impurity::SquaredError;
use super::node::TreeNode;
use super::params::TreeParams;
use super::pruning::{self, PruneSequence};
use super::selector::auto_prune;
use crate::data::dataset::{Dataset, RealNumber};
use crate::error::MlError;
use crate::metrics::regression::RegressionMetrics;
use nalgebra::{DMatrix, DVector};

/// Decision Tree Regressor
#[derive(Clone, Debug)]
pub struct DecisionTreeRegressor<T: RealNumber> {
    root: Option<Box<TreeNode<T, T>>>,
    tree_params: TreeParams,
    num_features: Option<usize>,
}

impl<T: RealNumber> Default for DecisionTreeRegressor<T> {
    /// Creates a new instance of the decision tree regressor with default parameters.
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealNumber> RegressionMetrics<T> for DecisionTreeRegressor<T> {}

impl<T: RealNumber> DecisionTreeRegressor<T> {
    /// Creates a new instance of the decision tree regressor with default parameters.
    pub fn new() -> Self {
        Self {
            root: None,
            tree_params: TreeParams::new(),
            num_features: None,
        }
    }

    /// Creates a new instance of the decision tree regressor with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `min_samples_split` - The minimum number of samples required to split an internal node.
    /// * `max_depth` - The maximum depth of the tree.
    /// * `min_samples_leaf` - The minimum number of samples each side of a split must keep.
    /// * `min_impurity_decrease` - The smallest impurity decrease that still justifies a split.
    ///
    /// # Errors
    ///
    /// This method will return an error if any parameter is outside its valid range.
    pub fn with_params(
        min_samples_split: Option<u16>,
        max_depth: Option<u16>,
        min_samples_leaf: Option<u16>,
        min_impurity_decrease: Option<f64>,
    ) -> Result<Self, MlError> {
        let mut tree = Self::new();

        tree.set_min_samples_split(min_samples_split.unwrap_or(2))?;
        tree.set_max_depth(max_depth)?;
        tree.set_min_samples_leaf(min_samples_leaf.unwrap_or(1))?;
        tree.set_min_impurity_decrease(min_impurity_decrease.unwrap_or(0.0))?;
        Ok(tree)
    }

    /// Sets the minimum number of samples required to split an internal node.
    ///
    /// # Errors
    ///
    /// This method will return an error if the minimum number of samples to split is less than 2.
    pub fn set_min_samples_split(&mut self, min_samples_split: u16) -> Result<(), MlError> {
        self.tree_params.set_min_samples_split(min_samples_split)
    }

    /// Sets the maximum depth of the tree.
    ///
    /// # Errors
    ///
    /// This method will return an error if the maximum depth is less than 1.
    pub fn set_max_depth(&mut self, max_depth: Option<u16>) -> Result<(), MlError> {
        self.tree_params.set_max_depth(max_depth)
    }

    /// Sets the minimum number of samples each side of a split must keep.
    ///
    /// # Errors
    ///
    /// This method will return an error if the minimum is less than 1.
    pub fn set_min_samples_leaf(&mut self, min_samples_leaf: u16) -> Result<(), MlError> {
        self.tree_params.set_min_samples_leaf(min_samples_leaf)
    }

    /// Sets the smallest impurity decrease that still justifies a split.
    ///
    /// # Errors
    ///
    /// This method will return an error if the value is negative.
    pub fn set_min_impurity_decrease(&mut self, min_impurity_decrease: f64) -> Result<(), MlError> {
        self.tree_params.set_min_impurity_decrease(min_impurity_decrease)
    }

    /// Returns the maximum depth of the tree.
    pub fn max_depth(&self) -> Option<u16> {
        self.tree_params.max_depth()
    }

    /// Returns the minimum number of samples required to split an internal node.
    pub fn min_samples_split(&self) -> u16 {
        self.tree_params.min_samples_split()
    }

    pub fn min_samples_leaf(&self) -> u16 {
        self.tree_params.min_samples_leaf()
    }

    pub fn min_impurity_decrease(&self) -> f64 {
        self.tree_params.min_impurity_decrease()
    }

    /// The fitted tree, if any.
    pub fn root(&self) -> Option<&TreeNode<T, T>> {
        self.root.as_deref()
    }

    /// Builds the decision tree from a dataset.
    ///
    /// # Arguments
    ///
    /// * `dataset` - The dataset containing features and labels.
    ///
    /// # Returns
    ///
    /// A string indicating that the tree was built successfully.
    ///
    /// # Errors
    ///
    /// This method will return an error if the dataset is empty or its
    /// labels do not match its rows.
    pub fn fit(&mut self, dataset: &Dataset<T, T>) -> Result<String, MlError> {
        let builder = TreeBuilder::new(self.tree_params.clone(), SquaredError);
        let root = builder.build(dataset)?;
        self.set_fitted(root, dataset.ncols());
        Ok("Finished building the tree.".into())
    }

    /// Builds the decision tree like [`Self::fit`], checking the token once
    /// per node. After cancellation the remaining nodes become leaves, so
    /// the resulting tree is valid but shallower.
    pub fn fit_cancellable(
        &mut self,
        dataset: &Dataset<T, T>,
        cancel_token: &CancelToken,
    ) -> Result<String, MlError> {
        let builder = TreeBuilder::new(self.tree_params.clone(), SquaredError)
            .with_cancel_token(cancel_token.clone());
        let root = builder.build(dataset)?;
        self.set_fitted(root, dataset.ncols());
        Ok("Finished building the tree.".into())
    }

    /// Builds the tree and prunes it to the subtree with the best k-fold
    /// cross-validated squared error.
    ///
    /// # Errors
    ///
    /// This method will return an error if fewer than two folds are
    /// requested or the folds outnumber the samples.
    pub fn fit_auto_prune(
        &mut self,
        dataset: &Dataset<T, T>,
        k_folds: usize,
        use_one_se_rule: bool,
    ) -> Result<String, MlError> {
        let root = auto_prune(
            dataset,
            &self.tree_params,
            SquaredError,
            k_folds,
            use_one_se_rule,
        )?;
        self.set_fitted(root, dataset.ncols());
        Ok("Finished building the pruned tree.".into())
    }

    /// Predicts the target values for new data.
    ///
    /// # Arguments
    ///
    /// * `features` - The matrix of features for the new data.
    ///
    /// # Returns
    ///
    /// A vector containing the predicted target values for the new data.
    ///
    /// # Errors
    ///
    /// This method will return an error if the tree wasn't built yet or the
    /// feature count differs from the training data.
    pub fn predict(&self, features: &DMatrix<T>) -> Result<DVector<T>, MlError> {
        let root = self.root.as_ref().ok_or(MlError::EmptyTree)?;
        let expected = self.num_features.ok_or(MlError::EmptyTree)?;
        if features.ncols() != expected {
            return Err(MlError::DimensionMismatch {
                expected,
                found: features.ncols(),
            });
        }

        let predictions = features
            .row_iter()
            .map(|row| root.predict(&row.transpose()))
            .collect::<Vec<_>>();

        Ok(DVector::from_vec(predictions))
    }

    /// Produces the cost-complexity prune sequence of the fitted tree.
    ///
    /// # Errors
    ///
    /// This method will return an error if the tree wasn't built yet.
    pub fn prune_sequence(&self) -> Result<PruneSequence<T, T>, MlError> {
        match &self.root {
            Some(root) => Ok(pruning::prune_sequence(root)),
            None => Err(MlError::EmptyTree),
        }
    }

    fn set_fitted(&mut self, root: TreeNode<T, T>, num_features: usize) {
        self.root = Some(Box::new(root));
        self.num_features = Some(num_features);
    }
}
