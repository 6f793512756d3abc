//! K-fold splitting

use crate::error::MlError;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

/// Splits row indices into k train/validation folds.
///
/// Validation folds are contiguous blocks of `n / k` indices and the last
/// fold absorbs the remainder. An optional shuffle permutes the indices
/// before they are cut into blocks.
#[derive(Clone, Debug)]
pub struct KFold {
    k: usize,
    shuffle: bool,
    seed: Option<u64>,
}

impl KFold {
    /// # Errors
    ///
    /// Returns an error if fewer than two folds are requested.
    pub fn new(k: usize) -> Result<Self, MlError> {
        if k < 2 {
            return Err(MlError::invalid_input(
                "cross-validation requires at least two folds",
            ));
        }
        Ok(Self {
            k,
            shuffle: false,
            seed: None,
        })
    }

    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Produces the `(train_indices, validation_indices)` pairs for a
    /// dataset of `num_samples` rows.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer samples than folds.
    pub fn split(&self, num_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>, MlError> {
        if self.k > num_samples {
            return Err(MlError::insufficient_data(format!(
                "{} folds requested but only {} samples are available",
                self.k, num_samples
            )));
        }

        let mut indices = (0..num_samples).collect::<Vec<_>>();
        if self.shuffle {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let fold_len = num_samples / self.k;
        let folds = (0..self.k)
            .map(|fold| {
                let start = fold * fold_len;
                let end = if fold + 1 == self.k {
                    num_samples
                } else {
                    start + fold_len
                };
                let validation = indices[start..end].to_vec();
                let train = indices[..start]
                    .iter()
                    .chain(indices[end..].iter())
                    .copied()
                    .collect();
                (train, validation)
            })
            .collect();
        Ok(folds)
    }
}
