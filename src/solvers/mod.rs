//! O-PLS estimators and their fitted models.

mod decomposition;
mod opls;
mod oplsda;

pub use decomposition::Decomposition;
pub use opls::{FittedOpls, OplsRegressor, OplsRegressorBuilder};
pub use oplsda::{FittedOplsDa, OplsDaClassifier, OplsDaClassifierBuilder};
