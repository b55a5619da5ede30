//! Orthogonal Partial Least Squares (O-PLS) regression and discriminant
//! analysis.
//!
//! The decomposition splits the X block into a single predictive latent
//! direction correlated with Y and one or more orthogonal directions
//! capturing Y-uncorrelated variance. On top of the fitted model the crate
//! provides cross-validated quality metrics (Q2), variable-importance
//! scores (VIP), multivariate outlier diagnostics (Hotelling T2, DmodX) and
//! permutation-based significance testing.
//!
//! # Example
//!
//! ```rust,ignore
//! use orthopls::prelude::*;
//! use faer::Mat;
//!
//! // Regression
//! let model = OplsRegressor::builder().n_components(3).build();
//! let fitted = model.fit(&x, &y)?;
//! println!("R2Y = {}", fitted.model_parameters().r2y);
//!
//! // Discriminant analysis with cross-validation and a permutation test
//! let da = OplsDaClassifier::new(2);
//! let splitter = KFold::new(7).with_shuffle(42);
//! let cv = cross_validate_da(&da, &x, &labels, &splitter, false)?;
//! let (_null, p) = permutation_test_da(&da, &x, &labels, 199, &splitter, 42)?;
//! println!("Q2Y = {}, p = {}", cv.q2y, p.q2y);
//! ```

pub mod core;
pub mod diagnostics;
pub mod metrics;
pub mod solvers;
pub mod utils;
pub mod validation;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        Block, ColumnScaler, CvParameters, LabelEncoder, ModelParameters, OplsError, PValues,
        PermutationResult, Scaler,
    };
    pub use crate::diagnostics::{
        dmodx, hotelling_t2, outliers, select_variables_by_vip, vip, vip_knee_threshold,
        OutlierMeasure,
    };
    pub use crate::solvers::{FittedOpls, FittedOplsDa, OplsDaClassifier, OplsRegressor};
    pub use crate::validation::{
        cross_validate, cross_validate_da, permutation_test, permutation_test_da, KFold, Splitter,
    };
}

pub use crate::core::{
    Block, ClassificationMetrics, ColumnScaler, CvClassification, CvDistributions, CvParameters,
    LabelEncoder, ModelParameterSet, ModelParameters, OplsError, PValues, PermutationResult,
    Scaler,
};
pub use crate::solvers::{
    Decomposition, FittedOpls, FittedOplsDa, OplsDaClassifier, OplsDaClassifierBuilder,
    OplsRegressor, OplsRegressorBuilder,
};
pub use crate::validation::{
    cross_validate, cross_validate_da, permutation_test, permutation_test_da, KFold, Splitter,
};
