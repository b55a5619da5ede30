//! Per-block data scaling.
//!
//! Models are generic over a [`Scaler`] so callers can plug in their own
//! preprocessing; [`ColumnScaler`] covers the usual chemometrics choices
//! (centering only, Pareto, unit variance) through its `scale_power`
//! exponent, and an identity configuration serves as the no-op default.

use faer::{Col, Mat};

use crate::core::error::OplsError;

/// Fit/transform/inverse-transform capability for one data block.
pub trait Scaler: Clone {
    /// Learn scaling parameters from `x`.
    fn fit(&mut self, x: &Mat<f64>);

    /// Apply the learned scaling. Fails with [`OplsError::NotFitted`] when
    /// called before `fit`.
    fn transform(&self, x: &Mat<f64>) -> Result<Mat<f64>, OplsError>;

    /// Undo the learned scaling.
    fn inverse_transform(&self, x: &Mat<f64>) -> Result<Mat<f64>, OplsError>;

    /// Fit to `x` and return the transformed block.
    fn fit_transform(&mut self, x: &Mat<f64>) -> Mat<f64> {
        self.fit(x);
        // Fit just happened, transform cannot fail.
        self.transform(x).unwrap_or_else(|_| x.clone())
    }
}

/// Column-wise scaler: optional mean centering plus division by
/// `stdev^scale_power`.
///
/// `scale_power` of 0 leaves the variance untouched (centering only), 0.5 is
/// Pareto scaling and 1 is unit-variance scaling. Constant columns keep a
/// scale factor of 1 so they pass through unchanged.
#[derive(Debug, Clone)]
pub struct ColumnScaler {
    with_mean: bool,
    scale_power: f64,
    means: Option<Col<f64>>,
    scales: Option<Col<f64>>,
}

impl ColumnScaler {
    /// Scaler with mean centering and the given standard-deviation exponent.
    pub fn new(scale_power: f64) -> Self {
        Self {
            with_mean: true,
            scale_power,
            means: None,
            scales: None,
        }
    }

    /// Mean centering only.
    pub fn centering() -> Self {
        Self::new(0.0)
    }

    /// Pareto scaling (centering plus division by sqrt of the stdev).
    pub fn pareto() -> Self {
        Self::new(0.5)
    }

    /// Unit-variance scaling.
    pub fn unit_variance() -> Self {
        Self::new(1.0)
    }

    /// No-op scaler: no centering, no scaling.
    pub fn identity() -> Self {
        Self {
            with_mean: false,
            scale_power: 0.0,
            means: None,
            scales: None,
        }
    }

    fn params(&self) -> Result<(&Col<f64>, &Col<f64>), OplsError> {
        match (&self.means, &self.scales) {
            (Some(m), Some(s)) => Ok((m, s)),
            _ => Err(OplsError::NotFitted),
        }
    }
}

impl Scaler for ColumnScaler {
    fn fit(&mut self, x: &Mat<f64>) {
        let (n, p) = (x.nrows(), x.ncols());
        let mut means = Col::zeros(p);
        let mut scales = Col::from_fn(p, |_| 1.0);

        for j in 0..p {
            let mut sum = 0.0;
            for i in 0..n {
                sum += x[(i, j)];
            }
            let mean = if n > 0 { sum / n as f64 } else { 0.0 };
            means[j] = if self.with_mean { mean } else { 0.0 };

            if self.scale_power != 0.0 && n > 0 {
                let mut var = 0.0;
                for i in 0..n {
                    var += (x[(i, j)] - mean).powi(2);
                }
                var /= n as f64;
                let std = var.sqrt();
                if std > 0.0 {
                    scales[j] = std.powf(self.scale_power);
                }
            }
        }

        self.means = Some(means);
        self.scales = Some(scales);
    }

    fn transform(&self, x: &Mat<f64>) -> Result<Mat<f64>, OplsError> {
        let (means, scales) = self.params()?;
        if x.ncols() != means.nrows() {
            return Err(OplsError::DimensionMismatch {
                what: "scaler columns",
                expected: means.nrows(),
                got: x.ncols(),
            });
        }
        Ok(Mat::from_fn(x.nrows(), x.ncols(), |i, j| {
            (x[(i, j)] - means[j]) / scales[j]
        }))
    }

    fn inverse_transform(&self, x: &Mat<f64>) -> Result<Mat<f64>, OplsError> {
        let (means, scales) = self.params()?;
        if x.ncols() != means.nrows() {
            return Err(OplsError::DimensionMismatch {
                what: "scaler columns",
                expected: means.nrows(),
                got: x.ncols(),
            });
        }
        Ok(Mat::from_fn(x.nrows(), x.ncols(), |i, j| {
            x[(i, j)] * scales[j] + means[j]
        }))
    }
}
