//! Classification quality metrics.
//!
//! The same functions serve fit-time, cross-validation and permutation-test
//! metric computation so that training and test definitions never drift
//! apart. ROC curves are always interpolated onto a fixed grid of
//! false-positive rates, which makes per-fold curves directly averageable.

use faer::Mat;

/// Number of grid points used when interpolating ROC curves.
pub const FPR_GRID_SIZE: usize = 20;

/// Equally spaced false-positive-rate grid on [0, 1].
pub fn fpr_grid() -> Vec<f64> {
    (0..FPR_GRID_SIZE)
        .map(|i| i as f64 / (FPR_GRID_SIZE - 1) as f64)
        .collect()
}

/// Averaging mode for precision/recall/F1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Average {
    /// Positive-class metrics; the positive class is the last entry of the
    /// sorted class set.
    Binary,
    /// Support-weighted one-vs-rest average over all classes.
    Weighted,
}

/// Fraction of correctly predicted labels.
pub fn accuracy_score(y_true: &[usize], y_pred: &[usize]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return f64::NAN;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Fraction of misclassified labels (1 - accuracy).
pub fn zero_one_loss(y_true: &[usize], y_pred: &[usize]) -> f64 {
    1.0 - accuracy_score(y_true, y_pred)
}

/// Indices of misclassified samples.
pub fn misclassified_samples(y_true: &[usize], y_pred: &[usize]) -> Vec<usize> {
    y_true
        .iter()
        .zip(y_pred.iter())
        .enumerate()
        .filter(|(_, (t, p))| t != p)
        .map(|(i, _)| i)
        .collect()
}

/// Confusion matrix with rows = true class, columns = predicted class,
/// both in the order given by `classes`.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], classes: &[usize]) -> Mat<f64> {
    let k = classes.len();
    let index = |label: usize| classes.iter().position(|&c| c == label);

    let mut cm = Mat::zeros(k, k);
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        if let (Some(i), Some(j)) = (index(t), index(p)) {
            cm[(i, j)] += 1.0;
        }
    }
    cm
}

/// Precision, recall and F1 in one pass.
pub fn precision_recall_f1(
    y_true: &[usize],
    y_pred: &[usize],
    classes: &[usize],
    average: Average,
) -> (f64, f64, f64) {
    let cm = confusion_matrix(y_true, y_pred, classes);
    let k = classes.len();

    let per_class = |c: usize| -> (f64, f64, f64, f64) {
        let mut tp = 0.0;
        let mut fp = 0.0;
        let mut false_neg = 0.0;
        for i in 0..k {
            for j in 0..k {
                let count = cm[(i, j)];
                if i == c && j == c {
                    tp += count;
                } else if j == c {
                    fp += count;
                } else if i == c {
                    false_neg += count;
                }
            }
        }
        let support: f64 = (0..k).map(|j| cm[(c, j)]).sum();
        let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
        let recall = if tp + false_neg > 0.0 {
            tp / (tp + false_neg)
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        (precision, recall, f1, support)
    };

    match average {
        Average::Binary => {
            let (p, r, f, _) = per_class(k - 1);
            (p, r, f)
        }
        Average::Weighted => {
            let total: f64 = y_true.len() as f64;
            let mut acc = (0.0, 0.0, 0.0);
            for c in 0..k {
                let (p, r, f, support) = per_class(c);
                let weight = if total > 0.0 { support / total } else { 0.0 };
                acc.0 += weight * p;
                acc.1 += weight * r;
                acc.2 += weight * f;
            }
            acc
        }
    }
}

/// Matthews correlation coefficient for binary problems.
///
/// Returns NaN when more than two classes are involved; a degenerate
/// denominator yields 0, matching the usual convention.
pub fn matthews_corrcoef(y_true: &[usize], y_pred: &[usize], classes: &[usize]) -> f64 {
    if classes.len() != 2 {
        return f64::NAN;
    }
    let cm = confusion_matrix(y_true, y_pred, classes);
    let tn = cm[(0, 0)];
    let fp = cm[(0, 1)];
    let false_neg = cm[(1, 0)];
    let tp = cm[(1, 1)];

    let denom = ((tp + fp) * (tp + false_neg) * (tn + fp) * (tn + false_neg)).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (tp * tn - fp * false_neg) / denom
    }
}

/// A ROC curve interpolated onto the fixed FPR grid, with its AUC.
#[derive(Debug, Clone)]
pub struct RocCurve {
    /// False-positive rates (the fixed grid).
    pub fpr: Vec<f64>,
    /// Interpolated true-positive rates.
    pub tpr: Vec<f64>,
    /// Area under the interpolated curve (trapezoidal).
    pub auc: f64,
}

/// ROC curve of a continuous score against a positive-class indicator,
/// interpolated onto [`fpr_grid`].
pub fn roc_curve_interpolated(is_positive: &[bool], scores: &[f64]) -> RocCurve {
    debug_assert_eq!(is_positive.len(), scores.len());
    let grid = fpr_grid();

    let n_pos = is_positive.iter().filter(|&&p| p).count();
    let n_neg = is_positive.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        log::warn!("ROC curve undefined: only one class present in the evaluation set");
        return RocCurve {
            fpr: grid.clone(),
            tpr: vec![f64::NAN; FPR_GRID_SIZE],
            auc: f64::NAN,
        };
    }

    // Sweep thresholds from high to low scores.
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));

    let mut fpr_points = vec![0.0];
    let mut tpr_points = vec![0.0];
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut idx = 0;
    while idx < order.len() {
        // Advance over ties so each distinct score yields one ROC point.
        let threshold = scores[order[idx]];
        while idx < order.len() && scores[order[idx]] == threshold {
            if is_positive[order[idx]] {
                tp += 1;
            } else {
                fp += 1;
            }
            idx += 1;
        }
        fpr_points.push(fp as f64 / n_neg as f64);
        tpr_points.push(tp as f64 / n_pos as f64);
    }

    let tpr = interpolate(&grid, &fpr_points, &tpr_points);
    let auc = trapezoid_area(&grid, &tpr);
    RocCurve {
        fpr: grid,
        tpr,
        auc,
    }
}

/// Linear interpolation of (xs, ys) onto the query points, clamping outside
/// the observed range. Duplicate xs collapse to the last (highest) y.
fn interpolate(queries: &[f64], xs: &[f64], ys: &[f64]) -> Vec<f64> {
    queries
        .iter()
        .map(|&q| {
            if q <= xs[0] {
                return ys[0];
            }
            if q >= xs[xs.len() - 1] {
                return ys[ys.len() - 1];
            }
            let mut hi = 1;
            while xs[hi] < q {
                hi += 1;
            }
            // Collapse duplicate abscissas to the step's upper value.
            if xs[hi] == q {
                let mut top = hi;
                while top + 1 < xs.len() && xs[top + 1] == q {
                    top += 1;
                }
                return ys[top];
            }
            let lo = hi - 1;
            let span = xs[hi] - xs[lo];
            ys[lo] + (ys[hi] - ys[lo]) * (q - xs[lo]) / span
        })
        .collect()
}

/// Trapezoidal area under (xs, ys).
pub fn trapezoid_area(xs: &[f64], ys: &[f64]) -> f64 {
    let mut area = 0.0;
    for i in 1..xs.len() {
        area += (xs[i] - xs[i - 1]) * (ys[i] + ys[i - 1]) / 2.0;
    }
    area
}
