//! Multivariate model diagnostics.
//!
//! All diagnostics consume a fitted model:
//!
//! - **Hotelling T2**: confidence ellipse over chosen score axes
//! - **DmodX**: normalized residual distance to the model subspace
//! - **VIP**: per-feature importance ranking with knee-point thresholding
//!
//! # Example
//!
//! ```rust,ignore
//! use orthopls::diagnostics::{hotelling_t2, outliers, vip, OutlierMeasure};
//!
//! let radii = hotelling_t2(&fitted, None, 0.05)?;
//! let suspects = outliers(&fitted, &x, OutlierMeasure::HotellingT2, None, 0.05)?;
//! let importance = vip(&fitted);
//! ```

mod dmodx;
mod hotelling;
mod vip;

pub use dmodx::{dmodx, dmodx_critical, dmodx_outlier_indices};
pub use hotelling::{hotelling_t2, t2_outlier_indices};
pub use vip::{select_variables_by_vip, vip, vip_knee_threshold};

use faer::Mat;

use crate::core::error::OplsError;
use crate::core::scaler::Scaler;
use crate::solvers::FittedOpls;

/// Outlier screening criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierMeasure {
    HotellingT2,
    DmodX,
}

/// Screen `x` for outlier candidates with the chosen measure.
///
/// `orth_comps` selects the orthogonal components included in the Hotelling
/// T2 rule (all of them when `None`); it is ignored for DmodX.
pub fn outliers<SX: Scaler, SY: Scaler>(
    fitted: &FittedOpls<SX, SY>,
    x: &Mat<f64>,
    measure: OutlierMeasure,
    orth_comps: Option<&[usize]>,
    alpha: f64,
) -> Result<Vec<usize>, OplsError> {
    match measure {
        OutlierMeasure::HotellingT2 => t2_outlier_indices(fitted, x, orth_comps, alpha),
        OutlierMeasure::DmodX => dmodx_outlier_indices(fitted, x, alpha),
    }
}
