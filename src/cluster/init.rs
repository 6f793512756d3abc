use crate::data::dataset::RealNumber;
use nalgebra::DMatrix;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;

/// Strategy for choosing the starting centroids of a clustering run.
///
/// Implementations receive the data with one sample per row and return a
/// matrix with one centroid per row. The caller guarantees that the data
/// holds more samples than requested centroids.
pub trait CentroidsInitialiser<T: RealNumber> {
    fn init(&self, data: &DMatrix<T>, rng: &mut StdRng, num_clusters: usize) -> DMatrix<T>;
}

/// Picks random data points as the starting centroids.
#[derive(Clone, Copy, Debug, Default)]
pub struct Forgy;

impl<T: RealNumber> CentroidsInitialiser<T> for Forgy {
    fn init(&self, data: &DMatrix<T>, rng: &mut StdRng, num_clusters: usize) -> DMatrix<T> {
        let chosen = rand::seq::index::sample(rng, data.nrows(), num_clusters).into_vec();
        DMatrix::from_fn(num_clusters, data.ncols(), |i, j| data[(chosen[i], j)])
    }
}

/// Assigns points to clusters randomly and returns the cluster means.
///
/// Means are accumulated as running averages, so a cluster that receives no
/// points keeps a centroid at the origin.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomPartition;

impl<T: RealNumber> CentroidsInitialiser<T> for RandomPartition {
    fn init(&self, data: &DMatrix<T>, rng: &mut StdRng, num_clusters: usize) -> DMatrix<T> {
        let mut centroids = DMatrix::<T>::zeros(num_clusters, data.ncols());
        let mut counts = vec![0usize; num_clusters];

        for i in 0..data.nrows() {
            let cluster = rng.gen_range(0..num_clusters);
            counts[cluster] += 1;
            let count = T::from_usize(counts[cluster]).unwrap();
            for j in 0..data.ncols() {
                let delta = (data[(i, j)] - centroids[(cluster, j)]) / count;
                centroids[(cluster, j)] += delta;
            }
        }
        centroids
    }
}

/// The k-means++ scheme: each subsequent centroid is a data point sampled
/// with probability proportional to its squared distance from the centroids
/// chosen so far.
#[derive(Clone, Copy, Debug, Default)]
pub struct KMeansPlusPlus;

impl<T: RealNumber> CentroidsInitialiser<T> for KMeansPlusPlus {
    fn init(&self, data: &DMatrix<T>, rng: &mut StdRng, num_clusters: usize) -> DMatrix<T> {
        let mut centroids = DMatrix::<T>::zeros(num_clusters, data.ncols());
        let mut weights = vec![1.0f64; data.nrows()];

        for n in 0..num_clusters {
            if n > 0 {
                for (i, weight) in weights.iter_mut().enumerate() {
                    let mut min_distance_squared = f64::INFINITY;
                    for k in 0..n {
                        let mut distance_squared = T::zero();
                        for j in 0..data.ncols() {
                            let diff = data[(i, j)] - centroids[(k, j)];
                            distance_squared += diff * diff;
                        }
                        min_distance_squared =
                            min_distance_squared.min(distance_squared.to_f64().unwrap());
                    }
                    *weight = min_distance_squared;
                }
            }
            let index = match WeightedIndex::new(&weights) {
                Ok(distribution) => distribution.sample(rng),
                Err(_) => rng.gen_range(0..data.nrows()),
            };
            for j in 0..data.ncols() {
                centroids[(n, j)] = data[(index, j)];
            }
        }
        centroids
    }
}
