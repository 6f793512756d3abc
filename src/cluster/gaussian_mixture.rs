use crate::cluster::init::{CentroidsInitialiser, Forgy};
use crate::error::MlError;
use nalgebra::{Cholesky, DMatrix, DVector};
use rand::{rngs::StdRng, SeedableRng};

// Keeps every covariance invertible while a component shrinks onto a
// single sample.
const COVARIANCE_RIDGE: f64 = 1e-15;

/// Gaussian mixture model fitted with expectation maximisation.
///
/// Every component is a multivariate normal distribution with its own mean,
/// covariance matrix and mixing probability. The expectation step fills the
/// responsibility matrix with the posterior component probabilities of every
/// sample, and the maximisation step re-estimates the component parameters
/// from those responsibilities. Fitting stops when the log-likelihood change
/// drops below `absolute_tolerance + relative_tolerance * |log_likelihood|`.
#[derive(Clone, Debug)]
pub struct GaussianMixture {
    num_components: usize,
    max_steps: usize,
    absolute_tolerance: f64,
    relative_tolerance: f64,
    seed: Option<u64>,
    mixing_probabilities: DVector<f64>,
    means: DMatrix<f64>,
    covariances: Vec<DMatrix<f64>>,
    responsibilities: DMatrix<f64>,
    log_likelihood: f64,
}

impl GaussianMixture {
    pub fn new(num_components: usize) -> Result<Self, MlError> {
        if num_components == 0 {
            return Err(MlError::invalid_input(
                "The number of components must be greater than 0.",
            ));
        }
        Ok(Self {
            num_components,
            max_steps: 100,
            absolute_tolerance: 1e-8,
            relative_tolerance: 1e-8,
            seed: None,
            mixing_probabilities: DVector::zeros(0),
            means: DMatrix::zeros(0, 0),
            covariances: Vec::new(),
            responsibilities: DMatrix::zeros(0, 0),
            log_likelihood: f64::NEG_INFINITY,
        })
    }

    pub fn with_params(
        num_components: usize,
        max_steps: Option<usize>,
        absolute_tolerance: Option<f64>,
        relative_tolerance: Option<f64>,
        seed: Option<u64>,
    ) -> Result<Self, MlError> {
        let mut model = Self::new(num_components)?;
        if let Some(steps) = max_steps {
            model.set_max_steps(steps)?;
        }
        if let Some(tolerance) = absolute_tolerance {
            model.set_absolute_tolerance(tolerance)?;
        }
        if let Some(tolerance) = relative_tolerance {
            model.set_relative_tolerance(tolerance)?;
        }
        if let Some(seed) = seed {
            model.set_seed(seed);
        }
        Ok(model)
    }

    pub fn set_max_steps(&mut self, max_steps: usize) -> Result<(), MlError> {
        if max_steps < 2 {
            return Err(MlError::invalid_input(
                "At least two steps are required for the convergence test.",
            ));
        }
        self.max_steps = max_steps;
        Ok(())
    }

    pub fn set_absolute_tolerance(&mut self, absolute_tolerance: f64) -> Result<(), MlError> {
        if !absolute_tolerance.is_finite() || absolute_tolerance < 0.0 {
            return Err(MlError::invalid_input(
                "The absolute tolerance must be a number greater than or equal to 0.",
            ));
        }
        self.absolute_tolerance = absolute_tolerance;
        Ok(())
    }

    pub fn set_relative_tolerance(&mut self, relative_tolerance: f64) -> Result<(), MlError> {
        if !relative_tolerance.is_finite() || relative_tolerance < 0.0 {
            return Err(MlError::invalid_input(
                "The relative tolerance must be a number greater than or equal to 0.",
            ));
        }
        self.relative_tolerance = relative_tolerance;
        Ok(())
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    pub fn number_components(&self) -> usize {
        self.num_components
    }

    pub fn mixing_probabilities(&self) -> &DVector<f64> {
        &self.mixing_probabilities
    }

    /// Component means, one per row.
    pub fn means(&self) -> &DMatrix<f64> {
        &self.means
    }

    pub fn covariance(&self, component: usize) -> Result<&DMatrix<f64>, MlError> {
        self.covariances
            .get(component)
            .ok_or_else(|| MlError::invalid_input(format!("There is no component {}.", component)))
    }

    /// Posterior component probabilities of the training samples, one row
    /// per sample.
    pub fn responsibilities(&self) -> &DMatrix<f64> {
        &self.responsibilities
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Fits the mixture with random data points as starting means.
    ///
    /// Returns whether the log-likelihood converged within the step limit.
    pub fn fit(&mut self, data: &DMatrix<f64>) -> Result<bool, MlError> {
        self.fit_with_initialiser(data, &Forgy)
    }

    /// Fits the mixture, drawing starting means from `initialiser`. Every
    /// covariance starts as the sample covariance of the whole dataset and
    /// the mixing probabilities start uniform.
    pub fn fit_with_initialiser<I: CentroidsInitialiser<f64>>(
        &mut self,
        data: &DMatrix<f64>,
        initialiser: &I,
    ) -> Result<bool, MlError> {
        if data.ncols() == 0 {
            return Err(MlError::invalid_input(
                "The data must have at least one feature.",
            ));
        }
        let num_samples = data.nrows();
        if num_samples < self.num_components {
            return Err(MlError::insufficient_data(format!(
                "{} samples cannot form {} components.",
                num_samples, self.num_components
            )));
        }
        if num_samples == self.num_components {
            // Each sample carries its own degenerate component.
            let uniform = 1.0 / self.num_components as f64;
            self.mixing_probabilities = DVector::from_element(self.num_components, uniform);
            self.means = data.clone();
            self.covariances = (0..self.num_components)
                .map(|_| DMatrix::zeros(data.ncols(), data.ncols()))
                .collect();
            self.responsibilities = DMatrix::identity(num_samples, self.num_components);
            self.log_likelihood = f64::INFINITY;
            return Ok(true);
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let uniform = 1.0 / self.num_components as f64;
        self.mixing_probabilities = DVector::from_element(self.num_components, uniform);
        self.means = initialiser.init(data, &mut rng, self.num_components);
        let sample_covariance = Self::sample_covariance(data);
        self.covariances = vec![sample_covariance; self.num_components];
        self.responsibilities = DMatrix::zeros(num_samples, self.num_components);

        let mut previous_log_likelihood: Option<f64> = None;
        let mut converged = false;
        for step in 0..self.max_steps {
            self.expectation(data)?;
            log::debug!("EM step {}: log-likelihood {}", step, self.log_likelihood);
            if let Some(previous) = previous_log_likelihood {
                let threshold = self.absolute_tolerance
                    + self.relative_tolerance * self.log_likelihood.abs();
                if (self.log_likelihood - previous).abs() < threshold {
                    converged = true;
                    break;
                }
            }
            previous_log_likelihood = Some(self.log_likelihood);
            self.maximisation(data);
        }
        Ok(converged)
    }

    /// Returns the component with the highest weighted density at `x`.
    pub fn assign_component(&self, x: &DVector<f64>) -> Result<usize, MlError> {
        if self.means.nrows() == 0 {
            return Err(MlError::invalid_input("The model has to be fitted first."));
        }
        if x.len() != self.means.ncols() {
            return Err(MlError::DimensionMismatch {
                expected: self.means.ncols(),
                found: x.len(),
            });
        }

        let mut best_component = 0;
        let mut best_density = f64::NEG_INFINITY;
        for component in 0..self.num_components {
            let (precision, determinant) =
                Self::precision(&self.covariances[component], component)?;
            let mean = self.means.row(component).transpose();
            let density = self.mixing_probabilities[component]
                * Self::density(x, &mean, &precision, determinant);
            if density > best_density {
                best_density = density;
                best_component = component;
            }
        }
        Ok(best_component)
    }

    pub fn predict(&self, x_pred: &DMatrix<f64>) -> Result<Vec<usize>, MlError> {
        if self.means.nrows() == 0 {
            return Err(MlError::invalid_input("The model has to be fitted first."));
        }
        if x_pred.ncols() != self.means.ncols() {
            return Err(MlError::DimensionMismatch {
                expected: self.means.ncols(),
                found: x_pred.ncols(),
            });
        }
        (0..x_pred.nrows())
            .map(|row| self.assign_component(&x_pred.row(row).transpose()))
            .collect()
    }

    fn expectation(&mut self, data: &DMatrix<f64>) -> Result<(), MlError> {
        let num_samples = data.nrows();
        let mut precisions = Vec::with_capacity(self.num_components);
        for component in 0..self.num_components {
            precisions.push(Self::precision(&self.covariances[component], component)?);
        }

        let mut log_likelihood = 0.0;
        for row in 0..num_samples {
            let x = data.row(row).transpose();
            let mut row_sum = 0.0;
            for (component, (precision, determinant)) in precisions.iter().enumerate() {
                let mean = self.means.row(component).transpose();
                let weighted = self.mixing_probabilities[component]
                    * Self::density(&x, &mean, precision, *determinant);
                self.responsibilities[(row, component)] = weighted;
                row_sum += weighted;
            }
            if row_sum > 0.0 {
                for component in 0..self.num_components {
                    self.responsibilities[(row, component)] /= row_sum;
                }
            } else {
                // The point is too far from every component to resolve.
                let uniform = 1.0 / self.num_components as f64;
                for component in 0..self.num_components {
                    self.responsibilities[(row, component)] = uniform;
                }
            }
            log_likelihood += row_sum.max(f64::MIN_POSITIVE).ln();
        }
        self.log_likelihood = log_likelihood;
        Ok(())
    }

    fn maximisation(&mut self, data: &DMatrix<f64>) {
        let num_samples = data.nrows();
        let num_features = data.ncols();
        for component in 0..self.num_components {
            let weight: f64 = self.responsibilities.column(component).sum();
            self.mixing_probabilities[component] = weight / num_samples as f64;
            if weight <= 0.0 {
                continue;
            }

            let mut mean = DVector::<f64>::zeros(num_features);
            for row in 0..num_samples {
                mean += data.row(row).transpose() * self.responsibilities[(row, component)];
            }
            mean /= weight;

            let mut covariance = DMatrix::<f64>::zeros(num_features, num_features);
            for row in 0..num_samples {
                let diff = data.row(row).transpose() - &mean;
                covariance += &diff * diff.transpose() * self.responsibilities[(row, component)];
            }
            covariance /= weight;

            self.means.row_mut(component).copy_from(&mean.transpose());
            self.covariances[component] = covariance;
        }
    }

    fn precision(
        covariance: &DMatrix<f64>,
        component: usize,
    ) -> Result<(DMatrix<f64>, f64), MlError> {
        let dim = covariance.nrows();
        let ridged = covariance + DMatrix::identity(dim, dim) * COVARIANCE_RIDGE;
        let cholesky = Cholesky::new(ridged).ok_or_else(|| {
            MlError::invalid_input(format!(
                "The covariance matrix of component {} is not positive definite.",
                component
            ))
        })?;
        let determinant = cholesky.determinant();
        Ok((cholesky.inverse(), determinant))
    }

    fn density(
        x: &DVector<f64>,
        mean: &DVector<f64>,
        precision: &DMatrix<f64>,
        determinant: f64,
    ) -> f64 {
        let diff = x - mean;
        let quadratic = (precision * &diff).dot(&diff);
        let normalisation =
            ((2.0 * std::f64::consts::PI).powi(x.len() as i32) * determinant).sqrt();
        (-0.5 * quadratic).exp() / normalisation
    }

    fn sample_covariance(data: &DMatrix<f64>) -> DMatrix<f64> {
        let num_samples = data.nrows();
        let num_features = data.ncols();
        let mean = data.row_mean().transpose();
        let mut covariance = DMatrix::<f64>::zeros(num_features, num_features);
        for row in 0..num_samples {
            let diff = data.row(row).transpose() - &mean;
            covariance += &diff * diff.transpose();
        }
        covariance / (num_samples - 1) as f64
    }
}
