//! Result structures published by fitting, cross-validation and
//! permutation testing.

use std::str::FromStr;

use faer::{Col, Mat};

use crate::core::error::OplsError;
use crate::metrics::RocCurve;

/// Selects which data block an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    X,
    Y,
}

impl FromStr for Block {
    type Err = OplsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" | "X" => Ok(Block::X),
            "y" | "Y" => Ok(Block::Y),
            other => Err(OplsError::Configuration(format!(
                "unrecognized block name '{other}', expected 'x' or 'y'"
            ))),
        }
    }
}

/// Goodness-of-fit parameters computed at fit time.
#[derive(Debug, Clone)]
pub struct ModelParameters {
    /// In-sample fraction of Y variance explained.
    pub r2y: f64,
    /// In-sample fraction of X variance explained (predicting X from Y).
    pub r2x: f64,
    /// Total sum of squares of the scaled X block.
    pub ssx: f64,
    /// Total sum of squares of the scaled Y block.
    pub ssy: f64,
    /// Residual sum of squares of X after the first 1..=k components.
    pub ssx_comp: Vec<f64>,
    /// Residual sum of squares of Y after the first 1..=k components.
    pub ssy_comp: Vec<f64>,
    /// Reference residual standard deviation of the training fit, used to
    /// normalize DmodX.
    pub s0x: f64,
    /// Classification metrics, present only for discriminant models.
    pub da: Option<ClassificationMetrics>,
}

/// Classification quality metrics, computed with identical definitions at
/// fit time and during cross-validation.
#[derive(Debug, Clone)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub zero_one_loss: f64,
    /// Matthews correlation coefficient; NaN for multiclass problems.
    pub matthews_mcc: f64,
    /// Rows = true class, columns = predicted class, sorted class order.
    pub confusion_matrix: Mat<f64>,
    /// One interpolated ROC curve per class (a single curve for binary).
    pub roc: Vec<RocCurve>,
    /// Area under each ROC curve.
    pub auc: Vec<f64>,
    /// Indices of misclassified samples.
    pub misclassified: Vec<usize>,
    /// Predicted class labels.
    pub predictions: Vec<usize>,
}

/// The per-variable, per-component parameter set of one fitted model.
///
/// Cross-validation and permutation testing store one of these per fold or
/// round; sign alignment flips all component-derived members together.
#[derive(Debug, Clone)]
pub struct ModelParameterSet {
    pub loadings_p: Mat<f64>,
    pub loadings_q: Mat<f64>,
    pub weights_w: Mat<f64>,
    pub weights_c: Mat<f64>,
    pub rotations_ws: Mat<f64>,
    pub rotations_cs: Mat<f64>,
    /// Regression coefficients; sign-flip invariant, never negated.
    pub beta: Mat<f64>,
    pub vip: Col<f64>,
}

impl ModelParameterSet {
    /// Negate every parameter derived from the given component.
    pub fn flip_component(&mut self, comp: usize) {
        for m in [
            &mut self.loadings_p,
            &mut self.weights_w,
            &mut self.rotations_ws,
        ] {
            for i in 0..m.nrows() {
                m[(i, comp)] = -m[(i, comp)];
            }
        }
        for m in [
            &mut self.loadings_q,
            &mut self.weights_c,
            &mut self.rotations_cs,
        ] {
            for i in 0..m.nrows() {
                m[(i, comp)] = -m[(i, comp)];
            }
        }
    }
}

/// Scores of one cross-validation fold, tagged with the original sample
/// indices they belong to.
#[derive(Debug, Clone)]
pub struct FoldScores {
    pub sample_indices: Vec<usize>,
    pub scores_t: Mat<f64>,
    pub scores_u: Mat<f64>,
}

impl FoldScores {
    pub fn flip_component(&mut self, comp: usize) {
        for i in 0..self.scores_t.nrows() {
            self.scores_t[(i, comp)] = -self.scores_t[(i, comp)];
        }
        for i in 0..self.scores_u.nrows() {
            self.scores_u[(i, comp)] = -self.scores_u[(i, comp)];
        }
    }
}

/// Aggregated cross-validation output.
#[derive(Debug, Clone)]
pub struct CvParameters {
    /// Cross-validated fraction of X variance explained.
    pub q2x: f64,
    /// Cross-validated fraction of Y variance explained.
    pub q2y: f64,
    pub mean_r2x_train: f64,
    pub stdev_r2x_train: f64,
    pub mean_r2y_train: f64,
    pub stdev_r2y_train: f64,
    pub mean_r2x_test: f64,
    pub stdev_r2x_test: f64,
    pub mean_r2y_test: f64,
    pub stdev_r2y_test: f64,
    pub mean_loadings_p: Mat<f64>,
    pub stdev_loadings_p: Mat<f64>,
    pub mean_loadings_q: Mat<f64>,
    pub stdev_loadings_q: Mat<f64>,
    pub mean_weights_w: Mat<f64>,
    pub stdev_weights_w: Mat<f64>,
    pub mean_weights_c: Mat<f64>,
    pub stdev_weights_c: Mat<f64>,
    pub mean_rotations_ws: Mat<f64>,
    pub stdev_rotations_ws: Mat<f64>,
    pub mean_rotations_cs: Mat<f64>,
    pub stdev_rotations_cs: Mat<f64>,
    pub mean_beta: Mat<f64>,
    pub stdev_beta: Mat<f64>,
    pub mean_vip: Col<f64>,
    pub stdev_vip: Col<f64>,
    /// Classification-specific aggregates, present for discriminant models.
    pub da: Option<CvClassification>,
    /// Raw per-fold values, retained when requested.
    pub distributions: Option<CvDistributions>,
}

/// Aggregated test-set classification metrics across folds.
#[derive(Debug, Clone)]
pub struct CvClassification {
    pub mean_accuracy: f64,
    pub stdev_accuracy: f64,
    pub mean_precision: f64,
    pub stdev_precision: f64,
    pub mean_recall: f64,
    pub stdev_recall: f64,
    pub mean_f1: f64,
    pub stdev_f1: f64,
    pub mean_auc: f64,
    pub stdev_auc: f64,
    pub mean_mcc: f64,
    pub stdev_mcc: f64,
    pub mean_zero_one_loss: f64,
    pub stdev_zero_one_loss: f64,
    /// Mean interpolated true-positive rates on the fixed FPR grid.
    pub mean_roc_tpr: Vec<f64>,
    pub stdev_roc_tpr: Vec<f64>,
    /// Pooled out-of-fold continuous predictions (scaled response space).
    pub ypred: Mat<f64>,
    /// Per-fold test confusion matrices.
    pub confusion_matrices: Vec<Mat<f64>>,
}

/// Raw per-fold distributions, kept when `output_dist` is requested.
#[derive(Debug, Clone)]
pub struct CvDistributions {
    pub r2x_train: Vec<f64>,
    pub r2y_train: Vec<f64>,
    pub r2x_test: Vec<f64>,
    pub r2y_test: Vec<f64>,
    /// Sign-aligned per-fold parameter sets.
    pub params: Vec<ModelParameterSet>,
    /// Sign-aligned held-out scores per fold.
    pub test_scores: Vec<FoldScores>,
    pub test_accuracy: Vec<f64>,
    pub test_f1: Vec<f64>,
    pub test_auc: Vec<f64>,
}

/// Null distributions generated by the permutation-test engine.
#[derive(Debug, Clone)]
pub struct PermutationResult {
    pub r2y: Vec<f64>,
    pub r2x: Vec<f64>,
    pub q2y: Vec<f64>,
    pub q2x: Vec<f64>,
    /// Per-round parameter sets, sign-aligned against the unpermuted model.
    pub params: Vec<ModelParameterSet>,
    /// Classification null distributions, present for discriminant models.
    pub da: Option<PermutationClassification>,
}

/// Classification null distributions (mean test metrics per round).
#[derive(Debug, Clone)]
pub struct PermutationClassification {
    pub accuracy: Vec<f64>,
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub f1: Vec<f64>,
    pub auc: Vec<f64>,
    pub zero_one_loss: Vec<f64>,
}

/// Empirical p-values with the +1 correction, bounded away from zero.
#[derive(Debug, Clone)]
pub struct PValues {
    pub q2y: f64,
    pub auc: Option<f64>,
    pub f1: Option<f64>,
}

/// Empirical p-value of an observed metric against its null distribution:
/// `(count(null >= observed) + 1) / (len + 1)`.
pub fn empirical_p_value(null: &[f64], observed: f64) -> f64 {
    let count = null.iter().filter(|&&v| v >= observed).count();
    (count + 1) as f64 / (null.len() + 1) as f64
}
