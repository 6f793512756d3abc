use crate::error::MlError;

#[derive(Clone, Debug)]
pub struct TreeParams {
    pub min_samples_split: u16,
    pub min_samples_leaf: u16,
    pub max_depth: Option<u16>,
    pub min_impurity_decrease: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeParams {
    pub fn new() -> Self {
        Self {
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_depth: None,
            min_impurity_decrease: 0.0,
        }
    }

    pub fn set_min_samples_split(&mut self, min_samples_split: u16) -> Result<(), MlError> {
        if min_samples_split < 2 {
            return Err(MlError::invalid_input(
                "The minimum number of samples to split must be greater than 1.",
            ));
        }
        self.min_samples_split = min_samples_split;
        Ok(())
    }

    pub fn set_min_samples_leaf(&mut self, min_samples_leaf: u16) -> Result<(), MlError> {
        if min_samples_leaf < 1 {
            return Err(MlError::invalid_input(
                "The minimum number of samples per leaf must be greater than 0.",
            ));
        }
        self.min_samples_leaf = min_samples_leaf;
        Ok(())
    }

    pub fn set_max_depth(&mut self, max_depth: Option<u16>) -> Result<(), MlError> {
        if max_depth.is_some_and(|depth| depth < 1) {
            return Err(MlError::invalid_input(
                "The maximum depth must be greater than 0.",
            ));
        }
        self.max_depth = max_depth;
        Ok(())
    }

    pub fn set_min_impurity_decrease(&mut self, min_impurity_decrease: f64) -> Result<(), MlError> {
        if min_impurity_decrease.is_nan() || min_impurity_decrease < 0.0 {
            return Err(MlError::invalid_input(
                "The minimum impurity decrease must not be negative.",
            ));
        }
        self.min_impurity_decrease = min_impurity_decrease;
        Ok(())
    }

    pub fn min_samples_split(&self) -> u16 {
        self.min_samples_split
    }

    pub fn min_samples_leaf(&self) -> u16 {
        self.min_samples_leaf
    }

    pub fn max_depth(&self) -> Option<u16> {
        self.max_depth
    }

    pub fn min_impurity_decrease(&self) -> f64 {
        self.min_impurity_decrease
    }
}

#[derive(Clone, Debug)]
pub struct TreeClassifierParams {
    pub base_params: TreeParams,
    pub criterion: String,
}

impl Default for TreeClassifierParams {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeClassifierParams {
    pub fn new() -> Self {
        Self {
            base_params: TreeParams::new(),
            criterion: "gini".to_string(),
        }
    }

    pub fn set_min_samples_split(&mut self, min_samples_split: u16) -> Result<(), MlError> {
        self.base_params.set_min_samples_split(min_samples_split)
    }

    pub fn set_min_samples_leaf(&mut self, min_samples_leaf: u16) -> Result<(), MlError> {
        self.base_params.set_min_samples_leaf(min_samples_leaf)
    }

    pub fn set_max_depth(&mut self, max_depth: Option<u16>) -> Result<(), MlError> {
        self.base_params.set_max_depth(max_depth)
    }

    pub fn set_min_impurity_decrease(&mut self, min_impurity_decrease: f64) -> Result<(), MlError> {
        self.base_params.set_min_impurity_decrease(min_impurity_decrease)
    }

    pub fn set_criterion(&mut self, criterion: String) -> Result<(), MlError> {
        if !["gini", "misclassification"].contains(&criterion.as_str()) {
            return Err(MlError::invalid_input(
                "The criterion must be either 'gini' or 'misclassification'.",
            ));
        }
        self.criterion = criterion;
        Ok(())
    }

    pub fn min_samples_split(&self) -> u16 {
        self.base_params.min_samples_split
    }

    pub fn min_samples_leaf(&self) -> u16 {
        self.base_params.min_samples_leaf
    }

    pub fn max_depth(&self) -> Option<u16> {
        self.base_params.max_depth
    }

    pub fn min_impurity_decrease(&self) -> f64 {
        self.base_params.min_impurity_decrease
    }

    pub fn criterion(&self) -> &str {
        &self.criterion
    }
}
