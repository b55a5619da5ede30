//! Class-label encoding for discriminant analysis.

use faer::Mat;

use crate::core::error::OplsError;

/// Maps class labels to the response encoding the regression core expects.
///
/// Class order is the sorted order of the unique training labels. Two classes
/// encode as a single {0, 1} column (1 = greater label); more classes encode
/// as a one-hot dummy matrix with one column per class.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<usize>,
}

impl LabelEncoder {
    /// Learn the class set from a label vector.
    pub fn fit(labels: &[usize]) -> Result<Self, OplsError> {
        let mut classes: Vec<usize> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(OplsError::Configuration(format!(
                "need at least 2 classes, found {}",
                classes.len()
            )));
        }
        Ok(Self { classes })
    }

    /// Sorted unique class labels.
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Column index of a label in the encoded response.
    pub fn index_of(&self, label: usize) -> Option<usize> {
        self.classes.binary_search(&label).ok()
    }

    /// Encode labels into the response matrix.
    pub fn encode(&self, labels: &[usize]) -> Result<Mat<f64>, OplsError> {
        let n = labels.len();
        let mut indices = Vec::with_capacity(n);
        for &label in labels {
            match self.index_of(label) {
                Some(idx) => indices.push(idx),
                None => {
                    return Err(OplsError::Configuration(format!(
                        "label {label} was not present at fit time"
                    )))
                }
            }
        }

        if self.n_classes() == 2 {
            Ok(Mat::from_fn(n, 1, |i, _| indices[i] as f64))
        } else {
            let k = self.n_classes();
            let mut dummy = Mat::zeros(n, k);
            for (i, &idx) in indices.iter().enumerate() {
                dummy[(i, idx)] = 1.0;
            }
            Ok(dummy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_encoding() {
        let encoder = LabelEncoder::fit(&[1, 0, 1, 1, 0]).expect("two classes");
        assert_eq!(encoder.classes(), &[0, 1]);
        let y = encoder.encode(&[0, 1, 1]).expect("known labels");
        assert_eq!(y.ncols(), 1);
        assert!((y[(0, 0)] - 0.0).abs() < 1e-12);
        assert!((y[(1, 0)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_multiclass_one_hot_sorted_columns() {
        let encoder = LabelEncoder::fit(&[7, 3, 5, 3, 7]).expect("three classes");
        assert_eq!(encoder.classes(), &[3, 5, 7]);
        let y = encoder.encode(&[5, 7, 3]).expect("known labels");
        assert_eq!(y.ncols(), 3);
        assert!((y[(0, 1)] - 1.0).abs() < 1e-12);
        assert!((y[(1, 2)] - 1.0).abs() < 1e-12);
        assert!((y[(2, 0)] - 1.0).abs() < 1e-12);
        // one-hot rows sum to 1
        for i in 0..3 {
            let row_sum: f64 = (0..3).map(|j| y[(i, j)]).sum();
            assert!((row_sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_class_rejected() {
        assert!(LabelEncoder::fit(&[2, 2, 2]).is_err());
    }

    #[test]
    fn test_unknown_label_rejected() {
        let encoder = LabelEncoder::fit(&[0, 1]).expect("two classes");
        assert!(encoder.encode(&[2]).is_err());
    }
}
