//! Orthogonal PLS decomposition engine.
//!
//! Splits the scaled X block into one predictive latent direction (maximally
//! correlated with Y) and a set of orthogonal directions capturing
//! Y-uncorrelated X variance. Orthogonal components are extracted first by
//! NIPALS-style power iteration with Gram-Schmidt filtering and rank-1
//! deflation; the predictive component is then recomputed from the deflated
//! block. Rotation matrices let new data be scored with a single matrix
//! product instead of re-running the iteration.

use faer::{Col, Mat};

use crate::core::error::OplsError;
use crate::utils::linalg::{invert_small, pseudo_inverse};
use crate::utils::matrix::{
    column, dot, matmul, matmul_nt, matmul_tn, matvec, matvec_tn, norm, prepend_column,
};

/// Convergence tolerance of the power iterations. Fixed by design, not a
/// per-call option.
pub(crate) const CONVERGENCE_TOLERANCE: f64 = 1e-10;

/// Iteration cap of the power iterations.
pub(crate) const MAX_ITERATIONS: usize = 500;

/// Pivot/singular-value tolerance for the rotation-matrix inverses.
pub(crate) const RANK_TOLERANCE: f64 = 1e-10;

/// All vectors and matrices produced by one decomposition.
///
/// The predictive component occupies column 0 of every combined matrix;
/// orthogonal components follow in extraction order.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub n_components: usize,

    // Predictive component
    pub t_pred: Col<f64>,
    pub w_pred: Col<f64>,
    pub p_pred: Col<f64>,
    pub u_pred: Col<f64>,
    pub c_pred: Col<f64>,
    pub q_pred: Col<f64>,

    // Orthogonal components, one column each
    pub t_ortho: Mat<f64>,
    pub w_ortho: Mat<f64>,
    pub p_ortho: Mat<f64>,
    pub u_ortho: Mat<f64>,
    pub c_ortho: Mat<f64>,
    pub q_ortho: Mat<f64>,

    /// X-side rotations: T = X_scaled * rotations_ws.
    pub rotations_ws: Mat<f64>,
    /// Y-side rotations: U = Y_scaled * rotations_cs.
    pub rotations_cs: Mat<f64>,

    /// Per-component inner regression of U on T (diagonal).
    pub b_t: Mat<f64>,
    /// Per-component inner regression of T on U (diagonal).
    pub b_u: Mat<f64>,

    /// Regression coefficients: Y_scaled ~ X_scaled * beta.
    pub beta: Mat<f64>,
}

impl Decomposition {
    /// Combined weights `[w_pred | w_ortho]`, n_features x k.
    pub fn weights_w(&self) -> Mat<f64> {
        prepend_column(&self.w_pred, &self.w_ortho)
    }

    /// Combined X loadings `[p_pred | p_ortho]`.
    pub fn loadings_p(&self) -> Mat<f64> {
        prepend_column(&self.p_pred, &self.p_ortho)
    }

    /// Combined Y weights `[c_pred | c_ortho]`, n_responses x k.
    pub fn weights_c(&self) -> Mat<f64> {
        prepend_column(&self.c_pred, &self.c_ortho)
    }

    /// Combined Y loadings `[q_pred | q_ortho]`.
    pub fn loadings_q(&self) -> Mat<f64> {
        prepend_column(&self.q_pred, &self.q_ortho)
    }

    /// Combined training X scores `[t_pred | t_ortho]`, n_samples x k.
    pub fn scores_t(&self) -> Mat<f64> {
        prepend_column(&self.t_pred, &self.t_ortho)
    }

    /// Combined training Y scores `[u_pred | u_ortho]`.
    pub fn scores_u(&self) -> Mat<f64> {
        prepend_column(&self.u_pred, &self.u_ortho)
    }
}

/// Dominant left singular vector of the cross-covariance X'Y.
fn initial_weight(s: &Mat<f64>) -> Result<Col<f64>, OplsError> {
    let m = s.ncols();

    if m == 1 {
        let mut w = column(s, 0);
        let n = norm(&w);
        if n < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "cross-covariance of X and Y",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        for i in 0..w.nrows() {
            w[i] /= n;
        }
        return Ok(w);
    }

    // Power iteration on (S S') through alternating multiplications.
    let mut v = Col::from_fn(m, |_| 1.0 / (m as f64).sqrt());
    let mut w = Col::zeros(s.nrows());
    for _ in 0..MAX_ITERATIONS {
        w = matvec(s, &v);
        let wn = norm(&w);
        if wn < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "cross-covariance of X and Y",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        for i in 0..w.nrows() {
            w[i] /= wn;
        }

        let mut v_new = matvec_tn(s, &w);
        let vn = norm(&v_new);
        if vn < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "cross-covariance of X and Y",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        for i in 0..v_new.nrows() {
            v_new[i] /= vn;
        }

        let mut delta = 0.0f64;
        for i in 0..m {
            delta = delta.max((v_new[i] - v[i]).abs());
        }
        v = v_new;
        if delta < CONVERGENCE_TOLERANCE {
            break;
        }
    }
    Ok(w)
}

/// Run the full O-PLS decomposition on scaled data.
pub(crate) fn fit_decomposition(
    x: &Mat<f64>,
    y: &Mat<f64>,
    n_components: usize,
) -> Result<Decomposition, OplsError> {
    let n = x.nrows();
    let p = x.ncols();
    let m = y.ncols();

    if y.nrows() != n {
        return Err(OplsError::DimensionMismatch {
            what: "Y rows",
            expected: n,
            got: y.nrows(),
        });
    }
    if n_components < 2 {
        return Err(OplsError::Configuration(format!(
            "n_components must be at least 2, got {n_components}"
        )));
    }
    if n_components > n.min(p) {
        return Err(OplsError::Configuration(format!(
            "n_components ({n_components}) exceeds min(n_samples, n_features) = {}",
            n.min(p)
        )));
    }

    let n_ortho = n_components - 1;
    let s = matmul_tn(x, y);
    let w = initial_weight(&s)?;

    let mut e = x.clone();
    let mut w_ortho = Mat::zeros(p, n_ortho);
    let mut p_ortho = Mat::zeros(p, n_ortho);
    let mut t_ortho = Mat::zeros(n, n_ortho);
    let mut u_ortho = Mat::zeros(n, n_ortho);
    let mut c_ortho = Mat::zeros(m, n_ortho);
    let mut q_ortho = Mat::zeros(m, n_ortho);

    for comp in 0..n_ortho {
        // NIPALS step against the current predictive direction.
        let t = matvec(&e, &w);
        let tt = dot(&t, &t);
        if tt < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "predictive score during orthogonal extraction",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        let mut p_load = matvec_tn(&e, &t);
        for i in 0..p {
            p_load[i] /= tt;
        }

        // Gram-Schmidt: remove the predictive direction from the loading.
        let proj = dot(&w, &p_load);
        let mut w_o = Col::from_fn(p, |i| p_load[i] - proj * w[i]);
        let w_o_norm = norm(&w_o);
        if w_o_norm < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "orthogonal weight extraction",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        for i in 0..p {
            w_o[i] /= w_o_norm;
        }

        let t_o = matvec(&e, &w_o);
        let t_o_ss = dot(&t_o, &t_o);
        if t_o_ss < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "orthogonal score extraction",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        let mut p_o = matvec_tn(&e, &t_o);
        for i in 0..p {
            p_o[i] /= t_o_ss;
        }

        // Y-side vectors of the orthogonal component; near-zero by
        // construction, kept for the combined matrices.
        let mut c_o = matvec_tn(y, &t_o);
        for i in 0..m {
            c_o[i] /= t_o_ss;
        }
        let c_o_ss = dot(&c_o, &c_o);
        let (u_o, q_o) = if c_o_ss > CONVERGENCE_TOLERANCE {
            let mut u_o = matvec(y, &c_o);
            for i in 0..n {
                u_o[i] /= c_o_ss;
            }
            let u_o_ss = dot(&u_o, &u_o);
            let q_o = if u_o_ss > CONVERGENCE_TOLERANCE {
                let mut q_o = matvec_tn(y, &u_o);
                for i in 0..m {
                    q_o[i] /= u_o_ss;
                }
                q_o
            } else {
                Col::zeros(m)
            };
            (u_o, q_o)
        } else {
            (Col::zeros(n), Col::zeros(m))
        };

        // Deflate: remove the rank-1 orthogonal reconstruction.
        for i in 0..n {
            for j in 0..p {
                e[(i, j)] -= t_o[i] * p_o[j];
            }
        }

        for i in 0..p {
            w_ortho[(i, comp)] = w_o[i];
            p_ortho[(i, comp)] = p_o[i];
        }
        for i in 0..n {
            t_ortho[(i, comp)] = t_o[i];
            u_ortho[(i, comp)] = u_o[i];
        }
        for i in 0..m {
            c_ortho[(i, comp)] = c_o[i];
            q_ortho[(i, comp)] = q_o[i];
        }
    }

    // Final predictive component from the deflated block: two-block power
    // iteration (converges in one pass for a univariate response).
    let mut u = {
        let mut best = 0;
        let mut best_ss = 0.0;
        for j in 0..m {
            let col = column(y, j);
            let ss = dot(&col, &col);
            if ss > best_ss {
                best_ss = ss;
                best = j;
            }
        }
        if best_ss < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "response block",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        column(y, best)
    };

    let mut w_pred = Col::zeros(p);
    let mut t_pred = Col::zeros(n);
    let mut c_pred = Col::zeros(m);
    let mut converged = false;
    for _ in 0..MAX_ITERATIONS {
        let uu = dot(&u, &u);
        w_pred = matvec_tn(&e, &u);
        for i in 0..p {
            w_pred[i] /= uu;
        }
        let w_norm = norm(&w_pred);
        if w_norm < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "predictive weight extraction",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        for i in 0..p {
            w_pred[i] /= w_norm;
        }

        t_pred = matvec(&e, &w_pred);
        let tt = dot(&t_pred, &t_pred);
        if tt < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "predictive score extraction",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        c_pred = matvec_tn(y, &t_pred);
        for i in 0..m {
            c_pred[i] /= tt;
        }
        let cc = dot(&c_pred, &c_pred);
        if cc < CONVERGENCE_TOLERANCE {
            return Err(OplsError::RankDeficiency {
                context: "response weight extraction",
                tolerance: CONVERGENCE_TOLERANCE,
            });
        }
        let mut u_new = matvec(y, &c_pred);
        for i in 0..n {
            u_new[i] /= cc;
        }

        if m == 1 {
            u = u_new;
            converged = true;
            break;
        }
        let mut delta = 0.0f64;
        let mut scale = 0.0f64;
        for i in 0..n {
            delta += (u_new[i] - u[i]).powi(2);
            scale += u_new[i].powi(2);
        }
        u = u_new;
        if delta <= CONVERGENCE_TOLERANCE * scale.max(f64::MIN_POSITIVE) {
            converged = true;
            break;
        }
    }
    if !converged {
        log::warn!(
            "predictive component power iteration hit the {MAX_ITERATIONS}-iteration cap \
             without reaching tolerance {CONVERGENCE_TOLERANCE:e}"
        );
    }

    let tt = dot(&t_pred, &t_pred);
    let uu = dot(&u, &u);
    let mut p_pred = matvec_tn(&e, &t_pred);
    for i in 0..p {
        p_pred[i] /= tt;
    }
    let mut q_pred = matvec_tn(y, &u);
    for i in 0..m {
        q_pred[i] /= uu;
    }
    let u_pred = u;

    // Combined matrices, predictive component first.
    let w_mat = prepend_column(&w_pred, &w_ortho);
    let p_mat = prepend_column(&p_pred, &p_ortho);
    let c_mat = prepend_column(&c_pred, &c_ortho);
    let q_mat = prepend_column(&q_pred, &q_ortho);
    let t_mat = prepend_column(&t_pred, &t_ortho);
    let u_mat = prepend_column(&u_pred, &u_ortho);

    // Rotations: T = X W (P'W)^-1 exactly reproduces the extracted scores;
    // the Y side uses a truncating pseudo-inverse because Q'C has rank
    // min(n_responses, k) by construction.
    let ptw = matmul_tn(&p_mat, &w_mat);
    let ptw_inv = invert_small(&ptw, RANK_TOLERANCE, "X-side rotation (P'W) inverse")?;
    let rotations_ws = matmul(&w_mat, &ptw_inv);

    let qtc = matmul_tn(&q_mat, &c_mat);
    let qtc_pinv = pseudo_inverse(&qtc, RANK_TOLERANCE, "Y-side rotation (Q'C) pseudo-inverse")?;
    let rotations_cs = matmul(&c_mat, &qtc_pinv);

    // Inner relations between paired scores, one coefficient per component.
    let k = n_components;
    let mut b_t = Mat::zeros(k, k);
    let mut b_u = Mat::zeros(k, k);
    for j in 0..k {
        let t_j = column(&t_mat, j);
        let u_j = column(&u_mat, j);
        let t_ss = dot(&t_j, &t_j);
        let u_ss = dot(&u_j, &u_j);
        b_t[(j, j)] = if t_ss > CONVERGENCE_TOLERANCE {
            dot(&u_j, &t_j) / t_ss
        } else {
            0.0
        };
        b_u[(j, j)] = if u_ss > CONVERGENCE_TOLERANCE {
            dot(&t_j, &u_j) / u_ss
        } else {
            0.0
        };
    }

    let beta = matmul_nt(&rotations_ws, &q_mat);

    Ok(Decomposition {
        n_components,
        t_pred,
        w_pred,
        p_pred,
        u_pred,
        c_pred,
        q_pred,
        t_ortho,
        w_ortho,
        p_ortho,
        u_ortho,
        c_ortho,
        q_ortho,
        rotations_ws,
        rotations_cs,
        b_t,
        b_u,
        beta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::matrix::l1_column_distance;

    /// Centered deterministic test block with one strong Y-correlated
    /// direction and one strong Y-orthogonal direction.
    fn test_data() -> (Mat<f64>, Mat<f64>) {
        let n = 40;
        let p = 6;
        let mut x = Mat::zeros(n, p);
        let mut y = Mat::zeros(n, 1);
        for i in 0..n {
            let signal = (i as f64 * 0.37).sin();
            let ortho = (i as f64 * 0.91).cos();
            for j in 0..p {
                let noise = ((i * 7 + j * 13) as f64).sin() * 0.05;
                x[(i, j)] = signal * (j as f64 + 1.0) / 3.0 + ortho * ((p - j) as f64) / 4.0 + noise;
            }
            y[(i, 0)] = signal;
        }
        // Center both blocks.
        for j in 0..p {
            let mean: f64 = (0..n).map(|i| x[(i, j)]).sum::<f64>() / n as f64;
            for i in 0..n {
                x[(i, j)] -= mean;
            }
        }
        let mean: f64 = (0..n).map(|i| y[(i, 0)]).sum::<f64>() / n as f64;
        for i in 0..n {
            y[(i, 0)] -= mean;
        }
        (x, y)
    }

    #[test]
    fn test_rotation_scores_match_iterative_scores() {
        let (x, y) = test_data();
        let decomp = fit_decomposition(&x, &y, 3).expect("fit");

        let t_direct = matmul(&x, &decomp.rotations_ws);
        let t_iterative = decomp.scores_t();
        for i in 0..x.nrows() {
            for j in 0..3 {
                assert!(
                    (t_direct[(i, j)] - t_iterative[(i, j)]).abs() < 1e-8,
                    "score mismatch at ({i}, {j})"
                );
            }
        }
    }

    #[test]
    fn test_orthogonal_weight_perpendicular_to_predictive() {
        let (x, y) = test_data();
        let decomp = fit_decomposition(&x, &y, 2).expect("fit");

        let w_o = column(&decomp.w_ortho, 0);
        // w_ortho was built orthogonal to the initial PLS direction; after
        // deflation the recomputed predictive weight stays numerically close
        // to perpendicular.
        assert!(dot(&decomp.w_pred, &w_o).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_scores_uncorrelated_with_y() {
        let (x, y) = test_data();
        let decomp = fit_decomposition(&x, &y, 3).expect("fit");

        let y_col = column(&y, 0);
        let y_norm = norm(&y_col);
        for j in 0..2 {
            let t_o = column(&decomp.t_ortho, j);
            let corr = dot(&t_o, &y_col) / (norm(&t_o) * y_norm);
            assert!(
                corr.abs() < 1e-6,
                "orthogonal component {j} correlates with Y: {corr}"
            );
        }
    }

    #[test]
    fn test_refit_reproduces_up_to_sign() {
        let (x, y) = test_data();
        let first = fit_decomposition(&x, &y, 3).expect("fit");
        let second = fit_decomposition(&x, &y, 3).expect("fit");

        let p1 = first.loadings_p();
        let p2 = second.loadings_p();
        for comp in 0..3 {
            let same = l1_column_distance(&p1, comp, &p2, comp, false);
            let flipped = l1_column_distance(&p1, comp, &p2, comp, true);
            assert!(same.min(flipped) < 1e-9);
        }
    }

    #[test]
    fn test_too_few_components_rejected() {
        let (x, y) = test_data();
        assert!(matches!(
            fit_decomposition(&x, &y, 1),
            Err(OplsError::Configuration(_))
        ));
    }

    #[test]
    fn test_uncorrelated_response_rejected() {
        let x = Mat::from_fn(10, 3, |i, j| ((i + j) as f64).sin());
        let y = Mat::zeros(10, 1);
        assert!(matches!(
            fit_decomposition(&x, &y, 2),
            Err(OplsError::RankDeficiency { .. })
        ));
    }

    #[test]
    fn test_beta_predicts_y() {
        let (x, y) = test_data();
        let decomp = fit_decomposition(&x, &y, 2).expect("fit");
        let y_hat = matmul(&x, &decomp.beta);

        let mut rss = 0.0;
        let mut tss = 0.0;
        for i in 0..x.nrows() {
            rss += (y[(i, 0)] - y_hat[(i, 0)]).powi(2);
            tss += y[(i, 0)].powi(2);
        }
        assert!(rss / tss < 0.05, "beta prediction too weak: {}", rss / tss);
    }
}
