//! Small dense factorizations used when building rotation matrices.
//!
//! The systems solved here are k x k where k is the number of latent
//! components, so simple pivoted elimination and one-sided Jacobi iteration
//! are both adequate and fully deterministic.

use faer::{Col, Mat};

use crate::core::error::OplsError;

/// Invert a small square matrix by Gauss-Jordan elimination with partial
/// pivoting. Fails with [`OplsError::RankDeficiency`] when a pivot falls
/// below `tolerance`.
pub fn invert_small(a: &Mat<f64>, tolerance: f64, context: &'static str) -> Result<Mat<f64>, OplsError> {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());

    // Augmented [A | I]
    let mut aug = Mat::zeros(n, 2 * n);
    for i in 0..n {
        for j in 0..n {
            aug[(i, j)] = a[(i, j)];
        }
        aug[(i, n + i)] = 1.0;
    }

    for k in 0..n {
        // Partial pivoting
        let mut max_val = aug[(k, k)].abs();
        let mut max_row = k;
        for i in (k + 1)..n {
            if aug[(i, k)].abs() > max_val {
                max_val = aug[(i, k)].abs();
                max_row = i;
            }
        }
        if max_val < tolerance {
            return Err(OplsError::RankDeficiency { context, tolerance });
        }
        if max_row != k {
            for j in 0..2 * n {
                let tmp = aug[(k, j)];
                aug[(k, j)] = aug[(max_row, j)];
                aug[(max_row, j)] = tmp;
            }
        }

        let pivot = aug[(k, k)];
        for j in 0..2 * n {
            aug[(k, j)] /= pivot;
        }
        for i in 0..n {
            if i == k {
                continue;
            }
            let factor = aug[(i, k)];
            if factor != 0.0 {
                for j in 0..2 * n {
                    aug[(i, j)] -= factor * aug[(k, j)];
                }
            }
        }
    }

    Ok(Mat::from_fn(n, n, |i, j| aug[(i, n + j)]))
}

/// Moore-Penrose pseudo-inverse via one-sided Jacobi SVD.
///
/// Singular values below `tolerance * sigma_max` are truncated to zero, so a
/// structurally rank-deficient input (e.g. the Y-side `Q'C` product with a
/// univariate response) is handled without error. A matrix with no singular
/// value above `tolerance` fails with [`OplsError::RankDeficiency`].
pub fn pseudo_inverse(a: &Mat<f64>, tolerance: f64, context: &'static str) -> Result<Mat<f64>, OplsError> {
    let (rows, cols) = (a.nrows(), a.ncols());
    let mut b = a.clone();
    let mut v = Mat::zeros(cols, cols);
    for j in 0..cols {
        v[(j, j)] = 1.0;
    }

    // One-sided Jacobi: orthogonalize column pairs of B, accumulating the
    // rotations into V so that A = B_final * V' with B_final = U * Sigma.
    let max_sweeps = 60;
    for _ in 0..max_sweeps {
        let mut off = 0.0f64;
        for p in 0..cols {
            for q in (p + 1)..cols {
                let mut alpha = 0.0;
                let mut beta = 0.0;
                let mut gamma = 0.0;
                for i in 0..rows {
                    alpha += b[(i, p)] * b[(i, p)];
                    beta += b[(i, q)] * b[(i, q)];
                    gamma += b[(i, p)] * b[(i, q)];
                }
                off = off.max(gamma.abs() / (alpha.sqrt() * beta.sqrt() + f64::MIN_POSITIVE));
                if gamma.abs() < f64::MIN_POSITIVE {
                    continue;
                }

                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;

                for i in 0..rows {
                    let bp = b[(i, p)];
                    let bq = b[(i, q)];
                    b[(i, p)] = c * bp - s * bq;
                    b[(i, q)] = s * bp + c * bq;
                }
                for i in 0..cols {
                    let vp = v[(i, p)];
                    let vq = v[(i, q)];
                    v[(i, p)] = c * vp - s * vq;
                    v[(i, q)] = s * vp + c * vq;
                }
            }
        }
        if off < 1e-14 {
            break;
        }
    }

    // Singular values are the column norms of the rotated B.
    let mut sigma = Col::zeros(cols);
    let mut sigma_max = 0.0f64;
    for j in 0..cols {
        let mut ssq = 0.0;
        for i in 0..rows {
            ssq += b[(i, j)] * b[(i, j)];
        }
        sigma[j] = ssq.sqrt();
        sigma_max = sigma_max.max(sigma[j]);
    }
    if sigma_max < tolerance {
        return Err(OplsError::RankDeficiency { context, tolerance });
    }

    // pinv(A) = sum over kept components of v_j * u_j' / sigma_j
    let cutoff = tolerance * sigma_max;
    let mut pinv = Mat::zeros(cols, rows);
    for j in 0..cols {
        if sigma[j] <= cutoff {
            continue;
        }
        let inv_s = 1.0 / sigma[j];
        for r in 0..cols {
            for i in 0..rows {
                // u_j[i] = b[(i, j)] / sigma[j]
                pinv[(r, i)] += v[(r, j)] * (b[(i, j)] * inv_s) * inv_s;
            }
        }
    }

    Ok(pinv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::matrix::matmul;

    #[test]
    fn test_invert_small_identity() {
        let mut a = Mat::zeros(3, 3);
        a[(0, 0)] = 2.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 1.0;
        a[(1, 1)] = 3.0;
        a[(2, 2)] = 4.0;

        let inv = invert_small(&a, 1e-12, "test").expect("invertible");
        let prod = matmul(&a, &inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[(i, j)] - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_invert_small_singular() {
        let mut a = Mat::zeros(2, 2);
        a[(0, 0)] = 1.0;
        a[(0, 1)] = 2.0;
        a[(1, 0)] = 2.0;
        a[(1, 1)] = 4.0;

        let result = invert_small(&a, 1e-12, "test");
        assert!(matches!(result, Err(OplsError::RankDeficiency { .. })));
    }

    #[test]
    fn test_pseudo_inverse_full_rank_equals_inverse() {
        let mut a = Mat::zeros(2, 2);
        a[(0, 0)] = 3.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 0.5;
        a[(1, 1)] = 2.0;

        let pinv = pseudo_inverse(&a, 1e-12, "test").expect("pinv");
        let prod = matmul(&a, &pinv);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[(i, j)] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_pseudo_inverse_rank_one() {
        // Outer product u*v' has rank 1; pinv = v*u' / (|u|^2 |v|^2).
        let u = [1.0, 2.0];
        let w = [3.0, 0.0, 4.0];
        let a = Mat::from_fn(2, 3, |i, j| u[i] * w[j]);

        let pinv = pseudo_inverse(&a, 1e-12, "test").expect("pinv");
        let uu: f64 = u.iter().map(|x| x * x).sum();
        let ww: f64 = w.iter().map(|x| x * x).sum();
        for i in 0..3 {
            for j in 0..2 {
                let expected = w[i] * u[j] / (uu * ww);
                assert!((pinv[(i, j)] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_pseudo_inverse_zero_matrix_fails() {
        let a = Mat::<f64>::zeros(3, 3);
        assert!(matches!(
            pseudo_inverse(&a, 1e-12, "test"),
            Err(OplsError::RankDeficiency { .. })
        ));
    }
}
