//! Hotelling T2 confidence ellipse and outlier screening.

use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::core::error::OplsError;
use crate::core::scaler::Scaler;
use crate::solvers::FittedOpls;

/// Score-matrix column indices for the predictive component plus the chosen
/// orthogonal components (all of them when `orth_comps` is `None`).
fn score_axes<SX: Scaler, SY: Scaler>(
    fitted: &FittedOpls<SX, SY>,
    orth_comps: Option<&[usize]>,
) -> Result<Vec<usize>, OplsError> {
    let n_ortho = fitted.n_components() - 1;
    let mut axes = vec![0usize];
    match orth_comps {
        None => axes.extend((0..n_ortho).map(|i| i + 1)),
        Some(list) => {
            for &i in list {
                if i >= n_ortho {
                    return Err(OplsError::Configuration(format!(
                        "orthogonal component index {i} out of range (model has {n_ortho})"
                    )));
                }
                axes.push(i + 1);
            }
        }
    }
    Ok(axes)
}

/// Hotelling T2 ellipse radii at significance level `alpha`, one radius per
/// chosen axis (predictive first, then the selected orthogonal components).
pub fn hotelling_t2<SX: Scaler, SY: Scaler>(
    fitted: &FittedOpls<SX, SY>,
    orth_comps: Option<&[usize]>,
    alpha: f64,
) -> Result<Vec<f64>, OplsError> {
    if !(0.0..1.0).contains(&alpha) || alpha == 0.0 {
        return Err(OplsError::Configuration(format!(
            "significance level must be in (0, 1), got {alpha}"
        )));
    }

    let axes = score_axes(fitted, orth_comps)?;
    let n = fitted.n_samples();
    let k = axes.len();
    if n <= k {
        return Err(OplsError::Configuration(format!(
            "Hotelling T2 needs more samples ({n}) than components ({k})"
        )));
    }

    let scores = fitted.scores_t();
    let nf = n as f64;
    let kf = k as f64;

    let f_dist = FisherSnedecor::new(kf, nf - kf).map_err(|e| {
        OplsError::Configuration(format!("invalid F-distribution parameters: {e}"))
    })?;
    let a = (nf - 1.0) / nf * kf * (nf * nf - 1.0) / (nf * (nf - kf))
        * f_dist.inverse_cdf(1.0 - alpha);

    let mut radii = Vec::with_capacity(k);
    for &axis in &axes {
        let mean_sq = (0..n).map(|i| scores[(i, axis)].powi(2)).sum::<f64>() / nf;
        radii.push((a * mean_sq).sqrt());
    }
    Ok(radii)
}

/// Indices of samples outside the Hotelling T2 ellipse:
/// `sum((score / radius)^2) > 1` over the chosen axes.
pub fn t2_outlier_indices<SX: Scaler, SY: Scaler>(
    fitted: &FittedOpls<SX, SY>,
    x: &faer::Mat<f64>,
    orth_comps: Option<&[usize]>,
    alpha: f64,
) -> Result<Vec<usize>, OplsError> {
    let radii = hotelling_t2(fitted, orth_comps, alpha)?;
    let axes = score_axes(fitted, orth_comps)?;
    let scores = fitted.transform(Some(x), None)?;

    let mut outliers = Vec::new();
    for i in 0..scores.nrows() {
        let mut dist = 0.0;
        for (r, &axis) in radii.iter().zip(axes.iter()) {
            dist += (scores[(i, axis)] / r).powi(2);
        }
        if dist > 1.0 {
            outliers.push(i);
        }
    }
    Ok(outliers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::OplsRegressor;
    use faer::Mat;

    fn fitted_model() -> (FittedOpls, Mat<f64>) {
        let n = 40;
        let p = 4;
        let mut x = Mat::zeros(n, p);
        let mut y = Mat::zeros(n, 1);
        for i in 0..n {
            let s = (i as f64 * 0.7).sin();
            let o = (i as f64 * 1.3).cos();
            for j in 0..p {
                x[(i, j)] = s * (j + 1) as f64 + o * (p - j) as f64 * 0.5
                    + ((i * 5 + j * 3) as f64).sin() * 0.05;
            }
            y[(i, 0)] = s;
        }
        let fitted = OplsRegressor::new(2).fit(&x, &y).expect("fit");
        (fitted, x)
    }

    #[test]
    fn test_radii_positive_and_per_axis() {
        let (fitted, _) = fitted_model();
        let radii = hotelling_t2(&fitted, None, 0.05).expect("radii");
        assert_eq!(radii.len(), 2);
        assert!(radii.iter().all(|&r| r > 0.0));
    }

    #[test]
    fn test_tighter_alpha_grows_radii() {
        let (fitted, _) = fitted_model();
        let strict = hotelling_t2(&fitted, None, 0.01).expect("radii");
        let loose = hotelling_t2(&fitted, None, 0.10).expect("radii");
        assert!(strict[0] > loose[0]);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let (fitted, _) = fitted_model();
        assert!(hotelling_t2(&fitted, None, 0.0).is_err());
        assert!(hotelling_t2(&fitted, None, 1.5).is_err());
    }

    #[test]
    fn test_out_of_range_component_rejected() {
        let (fitted, _) = fitted_model();
        assert!(hotelling_t2(&fitted, Some(&[5]), 0.05).is_err());
    }

    #[test]
    fn test_training_data_mostly_inside_ellipse() {
        let (fitted, x) = fitted_model();
        let outliers = t2_outlier_indices(&fitted, &x, None, 0.05).expect("screen");
        assert!(outliers.len() <= x.nrows() / 10);
    }
}
