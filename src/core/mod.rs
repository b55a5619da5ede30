//! Core types: errors, scaling, label encoding and result structures.

pub mod encoding;
pub mod error;
pub mod params;
pub mod scaler;

pub use encoding::LabelEncoder;
pub use error::OplsError;
pub use params::{
    Block, ClassificationMetrics, CvClassification, CvDistributions, CvParameters, FoldScores,
    ModelParameterSet, ModelParameters, PValues, PermutationClassification, PermutationResult,
};
pub use scaler::{ColumnScaler, Scaler};
