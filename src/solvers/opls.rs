//! Orthogonal PLS regression estimator and its fitted model.

use faer::{Col, Mat};

use crate::core::error::OplsError;
use crate::core::params::{Block, ModelParameters};
use crate::core::scaler::{ColumnScaler, Scaler};
use crate::solvers::decomposition::{fit_decomposition, Decomposition};
use crate::utils::matrix::{matmul, matmul_nt, sub, sum_of_squares, take_cols};

/// Orthogonal PLS regression estimator.
///
/// Configuration is immutable; `fit` returns a fresh [`FittedOpls`] and never
/// mutates the estimator, so reconfiguring means building a new estimator and
/// refitting.
///
/// # Example
///
/// ```rust,ignore
/// use orthopls::prelude::*;
/// use faer::Mat;
///
/// let model = OplsRegressor::builder()
///     .n_components(3)
///     .x_scaler(ColumnScaler::unit_variance())
///     .build();
/// let fitted = model.fit(&x, &y)?;
///
/// println!("R2Y = {}", fitted.model_parameters().r2y);
/// let scores = fitted.transform(Some(&x_new), None)?;
/// ```
#[derive(Debug, Clone)]
pub struct OplsRegressor<SX: Scaler = ColumnScaler, SY: Scaler = ColumnScaler> {
    n_components: usize,
    x_scaler: SX,
    y_scaler: SY,
}

impl OplsRegressor {
    /// Estimator with the given component count and mean-centering scalers.
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            x_scaler: ColumnScaler::centering(),
            y_scaler: ColumnScaler::centering(),
        }
    }

    /// Create a builder for configuring the estimator.
    pub fn builder() -> OplsRegressorBuilder {
        OplsRegressorBuilder::default()
    }
}

impl<SX: Scaler, SY: Scaler> OplsRegressor<SX, SY> {
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Fit the model. Fails before any work when the configuration is
    /// invalid; a failed decomposition publishes no fitted state.
    pub fn fit(&self, x: &Mat<f64>, y: &Mat<f64>) -> Result<FittedOpls<SX, SY>, OplsError> {
        if self.n_components < 2 {
            return Err(OplsError::Configuration(format!(
                "n_components must be at least 2, got {}",
                self.n_components
            )));
        }
        if x.nrows() != y.nrows() {
            return Err(OplsError::DimensionMismatch {
                what: "Y rows",
                expected: x.nrows(),
                got: y.nrows(),
            });
        }

        let mut x_scaler = self.x_scaler.clone();
        let mut y_scaler = self.y_scaler.clone();
        let xs = x_scaler.fit_transform(x);
        let ys = y_scaler.fit_transform(y);

        let decomposition = fit_decomposition(&xs, &ys, self.n_components)?;
        let scores_t = matmul(&xs, &decomposition.rotations_ws);
        let scores_u = matmul(&ys, &decomposition.rotations_cs);

        let params = compute_model_parameters(&xs, &ys, &decomposition);

        Ok(FittedOpls {
            x_scaler,
            y_scaler,
            decomposition,
            scores_t,
            scores_u,
            params,
            n_samples: x.nrows(),
            n_features: x.ncols(),
            n_responses: y.ncols(),
        })
    }
}

/// Goodness-of-fit statistics, including the cumulative per-component
/// residual sums of squares obtained by re-scoring with the first c
/// components only (a pure rotation-slice computation, no refitting).
fn compute_model_parameters(xs: &Mat<f64>, ys: &Mat<f64>, decomp: &Decomposition) -> ModelParameters {
    let n = xs.nrows();
    let p = xs.ncols();
    let k = decomp.n_components;

    let ssx = sum_of_squares(xs);
    let ssy = sum_of_squares(ys);

    let w_mat = decomp.weights_w();
    let q_mat = decomp.loadings_q();
    let p_mat = decomp.loadings_p();

    let mut ssx_comp = Vec::with_capacity(k);
    let mut ssy_comp = Vec::with_capacity(k);
    for c in 1..=k {
        let r_ws_c = take_cols(&decomp.rotations_ws, c);
        let q_c = take_cols(&q_mat, c);
        let beta_c = matmul_nt(&r_ws_c, &q_c);
        let y_hat = matmul(xs, &beta_c);
        ssy_comp.push(sum_of_squares(&sub(ys, &y_hat)));

        let r_cs_c = take_cols(&decomp.rotations_cs, c);
        let u_c = matmul(ys, &r_cs_c);
        let b_u_c = Mat::from_fn(c, c, |i, j| decomp.b_u[(i, j)]);
        let w_c = take_cols(&w_mat, c);
        let x_hat = matmul_nt(&matmul(&u_c, &b_u_c), &w_c);
        ssx_comp.push(sum_of_squares(&sub(xs, &x_hat)));
    }

    let r2y = 1.0 - ssy_comp[k - 1] / ssy;
    let r2x = 1.0 - ssx_comp[k - 1] / ssx;

    // Reference residual standard deviation for DmodX.
    let t_mat = decomp.scores_t();
    let reconstruction = matmul_nt(&t_mat, &p_mat);
    let rss_x = sum_of_squares(&sub(xs, &reconstruction));
    let dof = (n as f64 - k as f64 - 1.0) * (p as f64 - k as f64);
    let s0x = if dof > 0.0 {
        (rss_x / dof).sqrt()
    } else {
        log::warn!("DmodX reference undefined: too few samples or features for {k} components");
        f64::NAN
    };

    ModelParameters {
        r2y,
        r2x,
        ssx,
        ssy,
        ssx_comp,
        ssy_comp,
        s0x,
        da: None,
    }
}

/// A fitted Orthogonal PLS model.
///
/// Owns the fitted scalers, the full decomposition and the training scores;
/// the predictive component is column 0 of every combined matrix.
#[derive(Debug, Clone)]
pub struct FittedOpls<SX: Scaler = ColumnScaler, SY: Scaler = ColumnScaler> {
    x_scaler: SX,
    y_scaler: SY,
    decomposition: Decomposition,
    scores_t: Mat<f64>,
    scores_u: Mat<f64>,
    params: ModelParameters,
    n_samples: usize,
    n_features: usize,
    n_responses: usize,
}

impl<SX: Scaler, SY: Scaler> FittedOpls<SX, SY> {
    pub fn n_components(&self) -> usize {
        self.decomposition.n_components
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_responses(&self) -> usize {
        self.n_responses
    }

    /// The full decomposition (weights, loadings, scores, rotations).
    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    pub fn model_parameters(&self) -> &ModelParameters {
        &self.params
    }

    pub(crate) fn model_parameters_mut(&mut self) -> &mut ModelParameters {
        &mut self.params
    }

    /// Training X scores (predictive component in column 0).
    pub fn scores_t(&self) -> &Mat<f64> {
        &self.scores_t
    }

    /// Training Y scores.
    pub fn scores_u(&self) -> &Mat<f64> {
        &self.scores_u
    }

    pub fn x_scaler(&self) -> &SX {
        &self.x_scaler
    }

    pub fn y_scaler(&self) -> &SY {
        &self.y_scaler
    }

    /// Compute scores for one data block.
    ///
    /// Exactly one of `x`, `y` must be given: X yields T via `rotations_ws`,
    /// Y yields U via `rotations_cs`.
    pub fn transform(&self, x: Option<&Mat<f64>>, y: Option<&Mat<f64>>) -> Result<Mat<f64>, OplsError> {
        match (x, y) {
            (Some(_), Some(_)) => Err(OplsError::AmbiguousInput),
            (None, None) => Err(OplsError::MissingInput),
            (Some(x), None) => {
                self.check_features(x)?;
                let xs = self.x_scaler.transform(x)?;
                Ok(matmul(&xs, &self.decomposition.rotations_ws))
            }
            (None, Some(y)) => {
                self.check_responses(y)?;
                let ys = self.y_scaler.transform(y)?;
                Ok(matmul(&ys, &self.decomposition.rotations_cs))
            }
        }
    }

    /// Map scores back to the original data space through the loadings.
    pub fn inverse_transform(
        &self,
        t: Option<&Mat<f64>>,
        u: Option<&Mat<f64>>,
    ) -> Result<Mat<f64>, OplsError> {
        match (t, u) {
            (Some(_), Some(_)) => Err(OplsError::AmbiguousInput),
            (None, None) => Err(OplsError::MissingInput),
            (Some(t), None) => {
                self.check_components(t)?;
                let x_scaled = matmul_nt(t, &self.decomposition.loadings_p());
                self.x_scaler.inverse_transform(&x_scaled)
            }
            (None, Some(u)) => {
                self.check_components(u)?;
                let y_scaled = matmul_nt(u, &self.decomposition.loadings_q());
                self.y_scaler.inverse_transform(&y_scaled)
            }
        }
    }

    /// Predict one data block from the other.
    ///
    /// X predicts Y directly through the regression coefficients; Y predicts
    /// X through the Y-side scores and the inner relation `X = U b_u W'`.
    pub fn predict(&self, x: Option<&Mat<f64>>, y: Option<&Mat<f64>>) -> Result<Mat<f64>, OplsError> {
        match (x, y) {
            (Some(_), Some(_)) => Err(OplsError::AmbiguousInput),
            (None, None) => Err(OplsError::MissingInput),
            (Some(x), None) => {
                let y_scaled = self.predict_y_scaled(x)?;
                self.y_scaler.inverse_transform(&y_scaled)
            }
            (None, Some(y)) => {
                let x_scaled = self.predict_x_scaled(y)?;
                self.x_scaler.inverse_transform(&x_scaled)
            }
        }
    }

    /// R2 of one data block, predicted from the other.
    pub fn score(&self, x: &Mat<f64>, y: &Mat<f64>, block: Block) -> Result<f64, OplsError> {
        match block {
            Block::Y => {
                let mut fresh = self.y_scaler.clone();
                let y_scaled = fresh.fit_transform(y);
                let tss = sum_of_squares(&y_scaled);
                let y_pred = self.y_scaler.transform(&self.predict(Some(x), None)?)?;
                let rss = sum_of_squares(&sub(&y_scaled, &y_pred));
                Ok(1.0 - rss / tss)
            }
            Block::X => {
                let mut fresh = self.x_scaler.clone();
                let x_scaled = fresh.fit_transform(x);
                let tss = sum_of_squares(&x_scaled);
                let x_pred = self.x_scaler.transform(&self.predict(None, Some(y))?)?;
                let rss = sum_of_squares(&sub(&x_scaled, &x_pred));
                Ok(1.0 - rss / tss)
            }
        }
    }

    /// Scaled-space Y prediction (used for pooled PRESS accumulation).
    pub(crate) fn predict_y_scaled(&self, x: &Mat<f64>) -> Result<Mat<f64>, OplsError> {
        self.check_features(x)?;
        let xs = self.x_scaler.transform(x)?;
        Ok(matmul(&xs, &self.decomposition.beta))
    }

    /// Scaled-space X prediction from Y.
    pub(crate) fn predict_x_scaled(&self, y: &Mat<f64>) -> Result<Mat<f64>, OplsError> {
        self.check_responses(y)?;
        let ys = self.y_scaler.transform(y)?;
        let u = matmul(&ys, &self.decomposition.rotations_cs);
        let projected = matmul(&u, &self.decomposition.b_u);
        Ok(matmul_nt(&projected, &self.decomposition.weights_w()))
    }

    /// Per-sample residual sum of squares against the model subspace, in
    /// scaled X space.
    pub(crate) fn residual_ssx_rows(&self, x: &Mat<f64>) -> Result<Col<f64>, OplsError> {
        let xs = self.x_scaler.transform(x)?;
        let t = matmul(&xs, &self.decomposition.rotations_ws);
        let reconstruction = matmul_nt(&t, &self.decomposition.loadings_p());

        let n = xs.nrows();
        let mut residuals = Col::zeros(n);
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..xs.ncols() {
                sum += (xs[(i, j)] - reconstruction[(i, j)]).powi(2);
            }
            residuals[i] = sum;
        }
        Ok(residuals)
    }

    fn check_features(&self, x: &Mat<f64>) -> Result<(), OplsError> {
        if x.ncols() != self.n_features {
            return Err(OplsError::DimensionMismatch {
                what: "X columns",
                expected: self.n_features,
                got: x.ncols(),
            });
        }
        Ok(())
    }

    fn check_responses(&self, y: &Mat<f64>) -> Result<(), OplsError> {
        if y.ncols() != self.n_responses {
            return Err(OplsError::DimensionMismatch {
                what: "Y columns",
                expected: self.n_responses,
                got: y.ncols(),
            });
        }
        Ok(())
    }

    fn check_components(&self, scores: &Mat<f64>) -> Result<(), OplsError> {
        if scores.ncols() != self.n_components() {
            return Err(OplsError::DimensionMismatch {
                what: "score columns",
                expected: self.n_components(),
                got: scores.ncols(),
            });
        }
        Ok(())
    }
}

/// Builder for [`OplsRegressor`].
#[derive(Debug, Clone)]
pub struct OplsRegressorBuilder<SX: Scaler = ColumnScaler, SY: Scaler = ColumnScaler> {
    n_components: usize,
    x_scaler: SX,
    y_scaler: SY,
}

impl Default for OplsRegressorBuilder {
    fn default() -> Self {
        Self {
            n_components: 2,
            x_scaler: ColumnScaler::centering(),
            y_scaler: ColumnScaler::centering(),
        }
    }
}

impl<SX: Scaler, SY: Scaler> OplsRegressorBuilder<SX, SY> {
    /// Total number of components: 1 predictive + (n - 1) orthogonal.
    /// Must be at least 2.
    pub fn n_components(mut self, n: usize) -> Self {
        self.n_components = n;
        self
    }

    /// Scaler applied to the X block before fitting.
    pub fn x_scaler<S: Scaler>(self, scaler: S) -> OplsRegressorBuilder<S, SY> {
        OplsRegressorBuilder {
            n_components: self.n_components,
            x_scaler: scaler,
            y_scaler: self.y_scaler,
        }
    }

    /// Scaler applied to the Y block before fitting.
    pub fn y_scaler<S: Scaler>(self, scaler: S) -> OplsRegressorBuilder<SX, S> {
        OplsRegressorBuilder {
            n_components: self.n_components,
            x_scaler: self.x_scaler,
            y_scaler: scaler,
        }
    }

    pub fn build(self) -> OplsRegressor<SX, SY> {
        OplsRegressor {
            n_components: self.n_components,
            x_scaler: self.x_scaler,
            y_scaler: self.y_scaler,
        }
    }
}
