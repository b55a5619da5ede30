//! Train/test splitters for cross-validation.

use faer::Mat;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::error::OplsError;

/// One cross-validation split: (train indices, test indices).
pub type TrainTestSplit = (Vec<usize>, Vec<usize>);

/// Produces train/test index partitions for the cross-validation engine.
///
/// `y` is available so that label-aware splitters can stratify; [`KFold`]
/// ignores it.
pub trait Splitter {
    /// Number of splits this splitter will generate.
    fn n_splits(&self) -> usize;

    /// Generate the splits for a dataset.
    fn split(&self, x: &Mat<f64>, y: Option<&Mat<f64>>) -> Result<Vec<TrainTestSplit>, OplsError>;
}

/// K-fold splitter with optional seeded shuffling.
///
/// With shuffling disabled the folds are contiguous index ranges; with a
/// seed the permutation is fully deterministic.
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle_seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle_seed: None,
        }
    }

    /// Shuffle sample order with the given seed before partitioning.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

impl Splitter for KFold {
    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn split(&self, x: &Mat<f64>, _y: Option<&Mat<f64>>) -> Result<Vec<TrainTestSplit>, OplsError> {
        let n = x.nrows();
        if self.n_splits < 2 {
            return Err(OplsError::Configuration(format!(
                "k-fold needs at least 2 splits, got {}",
                self.n_splits
            )));
        }
        if self.n_splits > n {
            return Err(OplsError::Configuration(format!(
                "cannot split {n} samples into {} folds",
                self.n_splits
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }

        // The first n % k folds take one extra sample.
        let base = n / self.n_splits;
        let remainder = n % self.n_splits;
        let mut splits = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < remainder);
            let test: Vec<usize> = order[start..start + size].to_vec();
            let mut train: Vec<usize> = Vec::with_capacity(n - size);
            train.extend_from_slice(&order[..start]);
            train.extend_from_slice(&order[start + size..]);
            splits.push((train, test));
            start += size;
        }
        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> Mat<f64> {
        Mat::from_fn(n, 2, |i, j| (i + j) as f64)
    }

    #[test]
    fn test_folds_partition_all_samples() {
        let x = data(23);
        let splits = KFold::new(5).split(&x, None).expect("split");
        assert_eq!(splits.len(), 5);

        let mut seen = vec![false; 23];
        for (train, test) in &splits {
            assert_eq!(train.len() + test.len(), 23);
            for &i in test {
                assert!(!seen[i], "sample {i} in two test folds");
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        let x = data(20);
        let a = KFold::new(4).with_shuffle(42).split(&x, None).expect("split");
        let b = KFold::new(4).with_shuffle(42).split(&x, None).expect("split");
        assert_eq!(a, b);

        let c = KFold::new(4).with_shuffle(43).split(&x, None).expect("split");
        assert_ne!(a, c);
    }

    #[test]
    fn test_unshuffled_folds_are_contiguous() {
        let x = data(9);
        let splits = KFold::new(3).split(&x, None).expect("split");
        assert_eq!(splits[0].1, vec![0, 1, 2]);
        assert_eq!(splits[2].1, vec![6, 7, 8]);
    }

    #[test]
    fn test_invalid_split_counts() {
        let x = data(5);
        assert!(KFold::new(1).split(&x, None).is_err());
        assert!(KFold::new(6).split(&x, None).is_err());
    }
}
