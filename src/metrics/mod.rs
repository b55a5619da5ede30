//! Model quality metrics.

pub mod classification;

pub use classification::{
    accuracy_score, confusion_matrix, fpr_grid, matthews_corrcoef, misclassified_samples,
    precision_recall_f1, roc_curve_interpolated, trapezoid_area, zero_one_loss, Average, RocCurve,
    FPR_GRID_SIZE,
};
