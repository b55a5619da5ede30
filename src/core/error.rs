//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

/// Errors surfaced by model fitting, scoring and validation.
#[derive(Debug, Error)]
pub enum OplsError {
    /// Invalid configuration detected before any state is touched.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A transform/predict/diagnostic call on state that has not been fitted.
    #[error("operation requires a fitted model")]
    NotFitted,

    /// A dual-input operation received both of its mutually exclusive inputs.
    #[error("ambiguous input: supply either the X-side or the Y-side argument, not both")]
    AmbiguousInput,

    /// A dual-input operation received neither input.
    #[error("missing input: one of the X-side or Y-side arguments is required")]
    MissingInput,

    /// A pseudo-inverse or inverse hit a singular matrix beyond tolerance.
    #[error("rank-deficient matrix in {context} (tolerance {tolerance:e})")]
    RankDeficiency {
        context: &'static str,
        tolerance: f64,
    },

    /// Shape disagreement between inputs and the fitted model.
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}
