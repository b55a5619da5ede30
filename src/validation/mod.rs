//! Model validation: cross-validation, permutation testing and splitters.

mod cross_validation;
mod permutation;
mod splitter;

pub use cross_validation::{cross_validate, cross_validate_da};
pub use permutation::{permutation_test, permutation_test_da};
pub use splitter::{KFold, Splitter, TrainTestSplit};
