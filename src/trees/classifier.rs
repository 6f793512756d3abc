//! Decision Tree Classifier
use super::builder::{CancelToken, TreeBuilder};
use super::impurity::{GiniImpurity, ImpurityMetric, MisclassificationImpurity};
use super::node::TreeNode;
use super::params::TreeClassifierParams;
use super::pruning::{self, PruneSequence};
use super::selector::auto_prune;
use crate::data::dataset::{Dataset, Number, WholeNumber};
use crate::error::MlError;
use crate::metrics::classification::ClassificationMetrics;
use nalgebra::{DMatrix, DVector};

/// Decision Tree Classifier
#[derive(Clone, Debug)]
pub struct DecisionTreeClassifier<XT: Number, YT: WholeNumber> {
    root: Option<Box<TreeNode<XT, YT>>>,
    tree_params: TreeClassifierParams,
    num_features: Option<usize>,
}

impl<XT: Number, YT: WholeNumber> Default for DecisionTreeClassifier<XT, YT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<XT: Number, YT: WholeNumber> ClassificationMetrics<YT> for DecisionTreeClassifier<XT, YT> {}

impl<XT: Number, YT: WholeNumber> DecisionTreeClassifier<XT, YT> {
    /// Creates a new instance of the decision tree classifier with default parameters.
    pub fn new() -> Self {
        Self {
            root: None,
            tree_params: TreeClassifierParams::new(),
            num_features: None,
        }
    }

    /// Creates a new instance of the decision tree classifier with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `criterion` - The impurity criterion, either `"gini"` or `"misclassification"`.
    /// * `min_samples_split` - The minimum number of samples required to split an internal node.
    /// * `max_depth` - The maximum depth of the tree.
    /// * `min_samples_leaf` - The minimum number of samples each side of a split must keep.
    /// * `min_impurity_decrease` - The smallest impurity decrease that still justifies a split.
    ///
    /// # Errors
    ///
    /// This method will return an error if any parameter is outside its valid range.
    pub fn with_params(
        criterion: Option<String>,
        min_samples_split: Option<u16>,
        max_depth: Option<u16>,
        min_samples_leaf: Option<u16>,
        min_impurity_decrease: Option<f64>,
    ) -> Result<Self, MlError> {
        let mut tree = Self::new();

        tree.set_criterion(criterion.unwrap_or_else(|| "gini".to_string()))?;
        tree.set_min_samples_split(min_samples_split.unwrap_or(2))?;
        tree.set_max_depth(max_depth)?;
        tree.set_min_samples_leaf(min_samples_leaf.unwrap_or(1))?;
        tree.set_min_impurity_decrease(min_impurity_decrease.unwrap_or(0.0))?;
        Ok(tree)
    }

    /// Sets the impurity criterion, either `"gini"` or `"misclassification"`.
    ///
    /// # Errors
    ///
    /// This method will return an error for any other criterion name.
    pub fn set_criterion(&mut self, criterion: String) -> Result<(), MlError> {
        self.tree_params.set_criterion(criterion)
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

    pub fn criterion(&self) -> &str {
        self.tree_params.criterion()
    }

    pub fn min_samples_split(&self) -> u16 {
        self.tree_params.min_samples_split()
    }

    pub fn max_depth(&self) -> Option<u16> {
        self.tree_params.max_depth()
    }

    pub fn min_samples_leaf(&self) -> u16 {
        self.tree_params.min_samples_leaf()
    }

    pub fn min_impurity_decrease(&self) -> f64 {
        self.tree_params.min_impurity_decrease()
    }

    /// The fitted tree, if any.
    pub fn root(&self) -> Option<&TreeNode<XT, YT>> {
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
    pub fn fit(&mut self, dataset: &Dataset<XT, YT>) -> Result<String, MlError> {
        let root = match self.criterion() {
            "misclassification" => self.grow(dataset, MisclassificationImpurity, None)?,
            _ => self.grow(dataset, GiniImpurity, None)?,
        };
        self.set_fitted(root, dataset.ncols());
        Ok("Finished building the tree.".into())
    }

    /// Builds the decision tree like [`Self::fit`], checking the token once
    /// per node. After cancellation the remaining nodes become leaves, so
    /// the resulting tree is valid but shallower.
    pub fn fit_cancellable(
        &mut self,
        dataset: &Dataset<XT, YT>,
        cancel_token: &CancelToken,
    ) -> Result<String, MlError> {
        let token = Some(cancel_token.clone());
        let root = match self.criterion() {
            "misclassification" => self.grow(dataset, MisclassificationImpurity, token)?,
            _ => self.grow(dataset, GiniImpurity, token)?,
        };
        self.set_fitted(root, dataset.ncols());
        Ok("Finished building the tree.".into())
    }

    /// Builds the tree and prunes it to the subtree with the best k-fold
    /// cross-validated error.
    ///
    /// # Arguments
    ///
    /// * `dataset` - The dataset containing features and labels.
    /// * `k_folds` - The number of cross-validation folds.
    /// * `use_one_se_rule` - Whether to pick the most pruned tree within
    ///   one standard error of the best one.
    ///
    /// # Errors
    ///
    /// This method will return an error if fewer than two folds are
    /// requested or the folds outnumber the samples.
    pub fn fit_auto_prune(
        &mut self,
        dataset: &Dataset<XT, YT>,
        k_folds: usize,
        use_one_se_rule: bool,
    ) -> Result<String, MlError> {
        let params = self.tree_params.base_params.clone();
        let root = match self.criterion() {
            "misclassification" => auto_prune(
                dataset,
                &params,
                MisclassificationImpurity,
                k_folds,
                use_one_se_rule,
            )?,
            _ => auto_prune(dataset, &params, GiniImpurity, k_folds, use_one_se_rule)?,
        };
        self.set_fitted(root, dataset.ncols());
        Ok("Finished building the pruned tree.".into())
    }

    /// Predicts the labels for new data.
    ///
    /// # Arguments
    ///
    /// * `features` - The matrix of features for the new data.
    ///
    /// # Returns
    ///
    /// A vector containing the predicted labels for the new data.
    ///
    /// # Errors
    ///
    /// This method will return an error if the tree wasn't built yet or the
    /// feature count differs from the training data.
    pub fn predict(&self, features: &DMatrix<XT>) -> Result<DVector<YT>, MlError> {
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
    pub fn prune_sequence(&self) -> Result<PruneSequence<XT, YT>, MlError> {
        match &self.root {
            Some(root) => Ok(pruning::prune_sequence(root)),
            None => Err(MlError::EmptyTree),
        }
    }

    fn grow<M>(
        &self,
        dataset: &Dataset<XT, YT>,
        metric: M,
        cancel_token: Option<CancelToken>,
    ) -> Result<TreeNode<XT, YT>, MlError>
    where
        M: ImpurityMetric<YT> + Sync,
    {
        let mut builder = TreeBuilder::new(self.tree_params.base_params.clone(), metric);
        if let Some(token) = cancel_token {
            builder = builder.with_cancel_token(token);
        }
        builder.build(dataset)
    }

    fn set_fitted(&mut self, root: TreeNode<XT, YT>, num_features: usize) {
        self.root = Some(Box::new(root));
        self.num_features = Some(num_features);
    }
}
