//! DmodX: normalized distance of a sample to the model subspace.

use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::core::error::OplsError;
use crate::core::scaler::Scaler;
use crate::solvers::FittedOpls;

/// Normalized DmodX for each row of `x`.
///
/// The residual is the scaled-space distance of a sample to its k-component
/// reconstruction; it is normalized by the residual degrees of freedom
/// (features minus components) and the fit-time reference standard
/// deviation `s0x`.
pub fn dmodx<SX: Scaler, SY: Scaler>(
    fitted: &FittedOpls<SX, SY>,
    x: &Mat<f64>,
) -> Result<Col<f64>, OplsError> {
    let p = fitted.n_features();
    let k = fitted.n_components();
    if p <= k {
        return Err(OplsError::Configuration(format!(
            "DmodX requires more features ({p}) than components ({k})"
        )));
    }

    let s0x = fitted.model_parameters().s0x;
    let residuals = fitted.residual_ssx_rows(x)?;
    let dof = (p - k) as f64;
    Ok(Col::from_fn(residuals.nrows(), |i| {
        (residuals[i] / dof).sqrt() / s0x
    }))
}

/// F-distribution critical value for DmodX at significance `alpha`, with
/// degrees of freedom `(p - k, (n_screened - k - 1)(p - k))`.
pub fn dmodx_critical<SX: Scaler, SY: Scaler>(
    fitted: &FittedOpls<SX, SY>,
    n_screened: usize,
    alpha: f64,
) -> Result<f64, OplsError> {
    if !(0.0..1.0).contains(&alpha) || alpha == 0.0 {
        return Err(OplsError::Configuration(format!(
            "significance level must be in (0, 1), got {alpha}"
        )));
    }
    let p = fitted.n_features();
    let k = fitted.n_components();
    if p <= k || n_screened <= k + 1 {
        return Err(OplsError::Configuration(format!(
            "DmodX critical value undefined for {n_screened} samples, {p} features, {k} components"
        )));
    }

    let d1 = (p - k) as f64;
    let d2 = ((n_screened - k - 1) * (p - k)) as f64;
    let f_dist = FisherSnedecor::new(d1, d2).map_err(|e| {
        OplsError::Configuration(format!("invalid F-distribution parameters: {e}"))
    })?;
    Ok(f_dist.inverse_cdf(1.0 - alpha))
}

/// Indices of samples whose normalized DmodX exceeds the critical value.
pub fn dmodx_outlier_indices<SX: Scaler, SY: Scaler>(
    fitted: &FittedOpls<SX, SY>,
    x: &Mat<f64>,
    alpha: f64,
) -> Result<Vec<usize>, OplsError> {
    let distances = dmodx(fitted, x)?;
    let critical = dmodx_critical(fitted, x.nrows(), alpha)?;
    Ok((0..distances.nrows())
        .filter(|&i| distances[i] > critical)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::OplsRegressor;

    fn fitted_model() -> (FittedOpls, Mat<f64>) {
        let n = 50;
        let p = 8;
        let mut x = Mat::zeros(n, p);
        let mut y = Mat::zeros(n, 1);
        for i in 0..n {
            let s = (i as f64 * 0.31).sin();
            let o = (i as f64 * 0.87).cos();
            for j in 0..p {
                x[(i, j)] = s * (j + 1) as f64 * 0.4 + o * 0.6
                    + ((i * 11 + j * 7) as f64).sin() * 0.1;
            }
            y[(i, 0)] = s;
        }
        let fitted = OplsRegressor::new(2).fit(&x, &y).expect("fit");
        (fitted, x)
    }

    #[test]
    fn test_dmodx_non_negative() {
        let (fitted, x) = fitted_model();
        let d = dmodx(&fitted, &x).expect("dmodx");
        for i in 0..d.nrows() {
            assert!(d[i] >= 0.0);
        }
    }

    #[test]
    fn test_training_samples_near_unity() {
        // Normalized against the training dispersion, typical training
        // samples should sit around 1.
        let (fitted, x) = fitted_model();
        let d = dmodx(&fitted, &x).expect("dmodx");
        let mean: f64 = (0..d.nrows()).map(|i| d[i]).sum::<f64>() / d.nrows() as f64;
        assert!(mean > 0.2 && mean < 2.0, "mean DmodX {mean}");
    }

    #[test]
    fn test_distorted_sample_has_larger_dmodx() {
        let (fitted, x) = fitted_model();
        let baseline = dmodx(&fitted, &x).expect("dmodx");

        // Corrupt one sample far outside the model plane.
        let mut corrupted = x.clone();
        for j in 0..corrupted.ncols() {
            corrupted[(0, j)] = if j % 2 == 0 { 25.0 } else { -25.0 };
        }
        let distorted = dmodx(&fitted, &corrupted).expect("dmodx");
        assert!(distorted[0] > 5.0 * baseline[0]);

        let flagged = dmodx_outlier_indices(&fitted, &corrupted, 0.05).expect("screen");
        assert!(flagged.contains(&0));
    }

    #[test]
    fn test_critical_value_positive() {
        let (fitted, x) = fitted_model();
        let crit = dmodx_critical(&fitted, x.nrows(), 0.05).expect("critical");
        assert!(crit > 0.0);
    }
}
