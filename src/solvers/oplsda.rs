//! Orthogonal PLS discriminant analysis (O-PLS-DA).
//!
//! Wraps the regression core for classification: class labels are encoded
//! into a {0,1} column (binary) or a sorted-order one-hot matrix
//! (multiclass), the regression model is fitted against the encoded
//! response, and predictions are mapped back to classes with a
//! nearest-{0,1} rule (binary) or a nearest-centroid rule in score space
//! (multiclass).

use faer::Mat;

use crate::core::encoding::LabelEncoder;
use crate::core::error::OplsError;
use crate::core::params::ClassificationMetrics;
use crate::core::scaler::{ColumnScaler, Scaler};
use crate::metrics::{
    accuracy_score, confusion_matrix, matthews_corrcoef, misclassified_samples,
    precision_recall_f1, roc_curve_interpolated, zero_one_loss, Average,
};
use crate::solvers::opls::{FittedOpls, OplsRegressor};
use crate::utils::matrix::matmul_nt;

/// O-PLS-DA estimator.
///
/// The X block is unit-variance scaled by default; the encoded response is
/// always mean-centered internally (class labels are not variance-scaled).
#[derive(Debug, Clone)]
pub struct OplsDaClassifier<SX: Scaler = ColumnScaler> {
    n_components: usize,
    x_scaler: SX,
}

impl OplsDaClassifier {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            x_scaler: ColumnScaler::unit_variance(),
        }
    }

    pub fn builder() -> OplsDaClassifierBuilder {
        OplsDaClassifierBuilder::default()
    }
}

impl<SX: Scaler> OplsDaClassifier<SX> {
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Fit against integer class labels.
    pub fn fit(&self, x: &Mat<f64>, labels: &[usize]) -> Result<FittedOplsDa<SX>, OplsError> {
        if x.nrows() != labels.len() {
            return Err(OplsError::DimensionMismatch {
                what: "label rows",
                expected: x.nrows(),
                got: labels.len(),
            });
        }

        let encoder = LabelEncoder::fit(labels)?;
        let y_encoded = encoder.encode(labels)?;

        let core = OplsRegressor::builder()
            .n_components(self.n_components)
            .x_scaler(self.x_scaler.clone())
            .y_scaler(ColumnScaler::centering())
            .build()
            .fit(x, &y_encoded)?;

        // Per-class centroids in score space drive the multiclass
        // prediction rule.
        let k = core.n_components();
        let scores = core.scores_t();
        let n_classes = encoder.n_classes();
        let mut class_means = Mat::zeros(n_classes, k);
        let mut counts = vec![0usize; n_classes];
        for (i, &label) in labels.iter().enumerate() {
            let idx = encoder
                .index_of(label)
                .ok_or_else(|| OplsError::Configuration(format!("label {label} unknown to encoder")))?;
            counts[idx] += 1;
            for j in 0..k {
                class_means[(idx, j)] += scores[(i, j)];
            }
        }
        for c in 0..n_classes {
            for j in 0..k {
                class_means[(c, j)] /= counts[c].max(1) as f64;
            }
        }

        let mut fitted = FittedOplsDa {
            core,
            encoder,
            class_means,
        };
        let da_metrics = fitted.classification_metrics(x, labels)?;
        fitted.core.model_parameters_mut().da = Some(da_metrics);
        Ok(fitted)
    }
}

/// A fitted O-PLS-DA model.
#[derive(Debug, Clone)]
pub struct FittedOplsDa<SX: Scaler = ColumnScaler> {
    core: FittedOpls<SX, ColumnScaler>,
    encoder: LabelEncoder,
    class_means: Mat<f64>,
}

impl<SX: Scaler> FittedOplsDa<SX> {
    /// The underlying fitted regression model.
    pub fn core(&self) -> &FittedOpls<SX, ColumnScaler> {
        &self.core
    }

    pub fn n_components(&self) -> usize {
        self.core.n_components()
    }

    pub fn n_classes(&self) -> usize {
        self.encoder.n_classes()
    }

    /// Sorted class labels; encoding column order.
    pub fn classes(&self) -> &[usize] {
        self.encoder.classes()
    }

    /// Per-class score centroids (n_classes x n_components).
    pub fn class_means(&self) -> &Mat<f64> {
        &self.class_means
    }

    /// Continuous class score: the regression prediction of the encoded
    /// response. One column for binary models, one per class otherwise.
    pub fn predict_response(&self, x: &Mat<f64>) -> Result<Mat<f64>, OplsError> {
        self.core.predict(Some(x), None)
    }

    /// Predict class labels.
    ///
    /// Binary: nearest of {0, 1} to the continuous score. Multiclass:
    /// nearest class centroid in score space, ties resolved to the lowest
    /// class index.
    pub fn predict(&self, x: &Mat<f64>) -> Result<Vec<usize>, OplsError> {
        let classes = self.encoder.classes();

        if self.n_classes() == 2 {
            let response = self.predict_response(x)?;
            Ok((0..response.nrows())
                .map(|i| {
                    let v = response[(i, 0)];
                    if (v - 0.0).abs() <= (v - 1.0).abs() {
                        classes[0]
                    } else {
                        classes[1]
                    }
                })
                .collect())
        } else {
            let scores = self.core.transform(Some(x), None)?;
            let k = self.n_components();
            Ok((0..scores.nrows())
                .map(|i| {
                    let mut best = 0usize;
                    let mut best_dist = f64::INFINITY;
                    for c in 0..self.n_classes() {
                        let mut dist = 0.0;
                        for j in 0..k {
                            dist += (scores[(i, j)] - self.class_means[(c, j)]).powi(2);
                        }
                        if dist < best_dist {
                            best_dist = dist;
                            best = c;
                        }
                    }
                    classes[best]
                })
                .collect())
        }
    }

    /// Classification accuracy on the given data.
    pub fn score(&self, x: &Mat<f64>, labels: &[usize]) -> Result<f64, OplsError> {
        Ok(accuracy_score(labels, &self.predict(x)?))
    }

    /// Scores for one data block; the Y side accepts class labels and
    /// encodes them before projecting.
    pub fn transform(
        &self,
        x: Option<&Mat<f64>>,
        labels: Option<&[usize]>,
    ) -> Result<Mat<f64>, OplsError> {
        match (x, labels) {
            (Some(_), Some(_)) => Err(OplsError::AmbiguousInput),
            (None, None) => Err(OplsError::MissingInput),
            (Some(x), None) => self.core.transform(Some(x), None),
            (None, Some(labels)) => {
                let y = self.encoder.encode(labels)?;
                self.core.transform(None, Some(&y))
            }
        }
    }

    /// Scores back to the data space. The Y side reconstructs the encoded
    /// response without undoing the internal centering, mirroring how the
    /// dummy matrix is interpreted at prediction time.
    pub fn inverse_transform(
        &self,
        t: Option<&Mat<f64>>,
        u: Option<&Mat<f64>>,
    ) -> Result<Mat<f64>, OplsError> {
        match (t, u) {
            (Some(_), Some(_)) => Err(OplsError::AmbiguousInput),
            (None, None) => Err(OplsError::MissingInput),
            (Some(t), None) => self.core.inverse_transform(Some(t), None),
            (None, Some(u)) => Ok(matmul_nt(u, &self.core.decomposition().loadings_q())),
        }
    }

    /// Classification metrics with the definitions shared between fit time
    /// and cross-validation.
    pub(crate) fn classification_metrics(
        &self,
        x: &Mat<f64>,
        labels: &[usize],
    ) -> Result<ClassificationMetrics, OplsError> {
        let predictions = self.predict(x)?;
        let response = self.predict_response(x)?;
        let classes = self.encoder.classes();

        let average = if classes.len() == 2 {
            Average::Binary
        } else {
            Average::Weighted
        };
        let (precision, recall, f1) = precision_recall_f1(labels, &predictions, classes, average);

        let roc_classes = if classes.len() == 2 {
            vec![(classes[1], 0usize)]
        } else {
            classes.iter().enumerate().map(|(j, &c)| (c, j)).collect()
        };
        let mut roc = Vec::with_capacity(roc_classes.len());
        let mut auc = Vec::with_capacity(roc_classes.len());
        for (class_label, score_col) in roc_classes {
            let is_positive: Vec<bool> = labels.iter().map(|&l| l == class_label).collect();
            let scores: Vec<f64> = (0..response.nrows())
                .map(|i| response[(i, score_col)])
                .collect();
            let curve = roc_curve_interpolated(&is_positive, &scores);
            auc.push(curve.auc);
            roc.push(curve);
        }

        Ok(ClassificationMetrics {
            accuracy: accuracy_score(labels, &predictions),
            precision,
            recall,
            f1,
            zero_one_loss: zero_one_loss(labels, &predictions),
            matthews_mcc: matthews_corrcoef(labels, &predictions, classes),
            confusion_matrix: confusion_matrix(labels, &predictions, classes),
            roc,
            auc,
            misclassified: misclassified_samples(labels, &predictions),
            predictions,
        })
    }
}

/// Builder for [`OplsDaClassifier`].
#[derive(Debug, Clone)]
pub struct OplsDaClassifierBuilder<SX: Scaler = ColumnScaler> {
    n_components: usize,
    x_scaler: SX,
}

impl Default for OplsDaClassifierBuilder {
    fn default() -> Self {
        Self {
            n_components: 2,
            x_scaler: ColumnScaler::unit_variance(),
        }
    }
}

impl<SX: Scaler> OplsDaClassifierBuilder<SX> {
    /// Total number of components: 1 predictive + (n - 1) orthogonal.
    pub fn n_components(mut self, n: usize) -> Self {
        self.n_components = n;
        self
    }

    /// Scaler applied to the X block.
    pub fn x_scaler<S: Scaler>(self, scaler: S) -> OplsDaClassifierBuilder<S> {
        OplsDaClassifierBuilder {
            n_components: self.n_components,
            x_scaler: scaler,
        }
    }

    pub fn build(self) -> OplsDaClassifier<SX> {
        OplsDaClassifier {
            n_components: self.n_components,
            x_scaler: self.x_scaler,
        }
    }
}
