use crate::cluster::init::{CentroidsInitialiser, Forgy};
use crate::data::dataset::RealNumber;
use crate::error::MlError;
use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, SeedableRng};

/// K-means clustering.
///
/// A run alternates between assigning every sample to its nearest centroid
/// and moving each centroid to the mean of its samples. It converges when
/// exactly the same assignments are chosen twice in a row, or when the summed
/// squared centroid movement drops below the absolute tolerance.
///
/// # Examples
///
/// ```
/// use ferrite_ml::cluster::kmeans::KMeans;
/// use nalgebra::DMatrix;
///
/// let data = DMatrix::from_row_slice(2, 2, &[-1.0, 1.0, 0.5, 0.5]);
/// let mut model = KMeans::<f64>::new(2).unwrap();
///
/// let converged = model.fit(&data).unwrap();
/// assert!(converged);
/// assert_eq!(model.labels(), &[0, 1]);
/// ```
#[derive(Clone, Debug)]
pub struct KMeans<T: RealNumber> {
    num_clusters: usize,
    max_steps: usize,
    absolute_tolerance: f64,
    num_initialisations: usize,
    seed: Option<u64>,
    centroids: DMatrix<T>,
    labels: Vec<usize>,
    inertia: T,
}

impl<T: RealNumber> KMeans<T> {
    pub fn new(num_clusters: usize) -> Result<Self, MlError> {
        if num_clusters == 0 {
            return Err(MlError::invalid_input(
                "The number of clusters must be greater than 0.",
            ));
        }
        Ok(Self {
            num_clusters,
            max_steps: 100,
            absolute_tolerance: 1e-8,
            num_initialisations: 1,
            seed: None,
            centroids: DMatrix::zeros(0, 0),
            labels: Vec::new(),
            inertia: T::zero(),
        })
    }

    pub fn with_params(
        num_clusters: usize,
        max_steps: Option<usize>,
        absolute_tolerance: Option<f64>,
        num_initialisations: Option<usize>,
        seed: Option<u64>,
    ) -> Result<Self, MlError> {
        let mut model = Self::new(num_clusters)?;
        if let Some(steps) = max_steps {
            model.set_max_steps(steps)?;
        }
        if let Some(tolerance) = absolute_tolerance {
            model.set_absolute_tolerance(tolerance)?;
        }
        if let Some(initialisations) = num_initialisations {
            model.set_number_initialisations(initialisations)?;
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
        if absolute_tolerance.is_nan() || absolute_tolerance < 0.0 {
            return Err(MlError::invalid_input(
                "The absolute tolerance must be a number greater than or equal to 0.",
            ));
        }
        self.absolute_tolerance = absolute_tolerance;
        Ok(())
    }

    pub fn set_number_initialisations(
        &mut self,
        num_initialisations: usize,
    ) -> Result<(), MlError> {
        if num_initialisations == 0 {
            return Err(MlError::invalid_input(
                "The number of initialisations must be greater than 0.",
            ));
        }
        self.num_initialisations = num_initialisations;
        Ok(())
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    pub fn number_clusters(&self) -> usize {
        self.num_clusters
    }

    pub fn centroids(&self) -> &DMatrix<T> {
        &self.centroids
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Sum of squared distances between every sample and its assigned
    /// centroid, for the data the model was last fitted on.
    pub fn inertia(&self) -> T {
        self.inertia
    }

    /// Fits the clustering with random data points as starting centroids.
    ///
    /// Returns whether the run converged within the step limit.
    pub fn fit(&mut self, data: &DMatrix<T>) -> Result<bool, MlError> {
        self.fit_with_initialiser(data, &Forgy)
    }

    /// Fits the clustering, drawing starting centroids from `initialiser`.
    ///
    /// When several initialisations are configured, the run with the lowest
    /// inertia wins.
    pub fn fit_with_initialiser<I: CentroidsInitialiser<T>>(
        &mut self,
        data: &DMatrix<T>,
        initialiser: &I,
    ) -> Result<bool, MlError> {
        if data.ncols() == 0 {
            return Err(MlError::invalid_input(
                "The data must have at least one feature.",
            ));
        }
        let num_samples = data.nrows();
        if num_samples < self.num_clusters {
            return Err(MlError::insufficient_data(format!(
                "{} samples cannot form {} clusters.",
                num_samples, self.num_clusters
            )));
        }
        if num_samples == self.num_clusters {
            // Each sample becomes its own cluster.
            self.centroids = data.clone();
            self.labels = (0..num_samples).collect();
            self.inertia = T::zero();
            return Ok(true);
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (mut centroids, mut labels, mut converged) = self.run(data, initialiser, &mut rng);
        let mut inertia = Self::total_inertia(data, &centroids, &labels);
        for _ in 1..self.num_initialisations {
            let (candidate_centroids, candidate_labels, candidate_converged) =
                self.run(data, initialiser, &mut rng);
            let candidate_inertia =
                Self::total_inertia(data, &candidate_centroids, &candidate_labels);
            if candidate_inertia < inertia {
                inertia = candidate_inertia;
                centroids = candidate_centroids;
                labels = candidate_labels;
                converged = candidate_converged;
            }
        }

        self.centroids = centroids;
        self.labels = labels;
        self.inertia = inertia;
        Ok(converged)
    }

    /// Returns the cluster index for a single point together with the squared
    /// distance to that cluster's centroid.
    pub fn assign_label(&self, x: &DVector<T>) -> Result<(usize, T), MlError> {
        if self.centroids.nrows() == 0 {
            return Err(MlError::invalid_input("The model has to be fitted first."));
        }
        if x.len() != self.centroids.ncols() {
            return Err(MlError::DimensionMismatch {
                expected: self.centroids.ncols(),
                found: x.len(),
            });
        }

        let mut best_cluster = 0;
        let mut best_distance = T::infinity();
        for cluster in 0..self.centroids.nrows() {
            let mut distance = T::zero();
            for j in 0..self.centroids.ncols() {
                let diff = x[j] - self.centroids[(cluster, j)];
                distance += diff * diff;
            }
            if distance < best_distance {
                best_distance = distance;
                best_cluster = cluster;
            }
        }
        Ok((best_cluster, best_distance))
    }

    pub fn predict(&self, x_pred: &DMatrix<T>) -> Result<Vec<usize>, MlError> {
        if self.centroids.nrows() == 0 {
            return Err(MlError::invalid_input("The model has to be fitted first."));
        }
        if x_pred.ncols() != self.centroids.ncols() {
            return Err(MlError::DimensionMismatch {
                expected: self.centroids.ncols(),
                found: x_pred.ncols(),
            });
        }
        Ok((0..x_pred.nrows())
            .map(|row| Self::closest_centroid(&self.centroids, x_pred, row).0)
            .collect())
    }

    fn run<I: CentroidsInitialiser<T>>(
        &self,
        data: &DMatrix<T>,
        initialiser: &I,
        rng: &mut StdRng,
    ) -> (DMatrix<T>, Vec<usize>, bool) {
        let num_samples = data.nrows();
        let mut centroids = initialiser.init(data, rng, self.num_clusters);
        let mut labels = vec![0usize; num_samples];
        let mut previous_labels: Option<Vec<usize>> = None;
        let tolerance = T::from_f64(self.absolute_tolerance).unwrap();
        let mut converged = false;

        for step in 0..self.max_steps {
            for (row, label) in labels.iter_mut().enumerate() {
                *label = Self::closest_centroid(&centroids, data, row).0;
            }
            if previous_labels.as_ref() == Some(&labels) {
                converged = true;
                break;
            }
            previous_labels = Some(labels.clone());

            let previous_centroids = centroids.clone();
            let mut counts = vec![0usize; self.num_clusters];
            let mut sums = DMatrix::<T>::zeros(self.num_clusters, data.ncols());
            for (row, &cluster) in labels.iter().enumerate() {
                counts[cluster] += 1;
                for j in 0..data.ncols() {
                    sums[(cluster, j)] += data[(row, j)];
                }
            }
            for (cluster, &count) in counts.iter().enumerate() {
                // A cluster that lost all its samples keeps its centroid.
                if count == 0 {
                    continue;
                }
                let count = T::from_usize(count).unwrap();
                for j in 0..data.ncols() {
                    centroids[(cluster, j)] = sums[(cluster, j)] / count;
                }
            }

            let mut shift = T::zero();
            for (new, old) in centroids.iter().zip(previous_centroids.iter()) {
                let diff = *new - *old;
                shift += diff * diff;
            }
            log::debug!("k-means step {}: centroid shift {}", step, shift);
            if shift < tolerance {
                converged = true;
                break;
            }
        }
        (centroids, labels, converged)
    }

    fn closest_centroid(centroids: &DMatrix<T>, data: &DMatrix<T>, row: usize) -> (usize, T) {
        let mut best_cluster = 0;
        let mut best_distance = T::infinity();
        for cluster in 0..centroids.nrows() {
            let mut distance = T::zero();
            for j in 0..centroids.ncols() {
                let diff = data[(row, j)] - centroids[(cluster, j)];
                distance += diff * diff;
            }
            if distance < best_distance {
                best_distance = distance;
                best_cluster = cluster;
            }
        }
        (best_cluster, best_distance)
    }

    fn total_inertia(data: &DMatrix<T>, centroids: &DMatrix<T>, labels: &[usize]) -> T {
        let mut inertia = T::zero();
        for (row, &cluster) in labels.iter().enumerate() {
            for j in 0..data.ncols() {
                let diff = data[(row, j)] - centroids[(cluster, j)];
                inertia += diff * diff;
            }
        }
        inertia
    }
}
