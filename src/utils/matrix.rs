//! Dense matrix helpers shared by the decomposition and validation engines.

use faer::{Col, Mat};

/// Matrix product `a * b`.
pub fn matmul(a: &Mat<f64>, b: &Mat<f64>) -> Mat<f64> {
    let (n, k) = (a.nrows(), a.ncols());
    let p = b.ncols();
    debug_assert_eq!(k, b.nrows());

    let mut out = Mat::zeros(n, p);
    for i in 0..n {
        for j in 0..p {
            let mut sum = 0.0;
            for l in 0..k {
                sum += a[(i, l)] * b[(l, j)];
            }
            out[(i, j)] = sum;
        }
    }
    out
}

/// Matrix product `a' * b` without materializing the transpose.
pub fn matmul_tn(a: &Mat<f64>, b: &Mat<f64>) -> Mat<f64> {
    let (n, k) = (a.nrows(), a.ncols());
    let p = b.ncols();
    debug_assert_eq!(n, b.nrows());

    let mut out = Mat::zeros(k, p);
    for i in 0..k {
        for j in 0..p {
            let mut sum = 0.0;
            for l in 0..n {
                sum += a[(l, i)] * b[(l, j)];
            }
            out[(i, j)] = sum;
        }
    }
    out
}

/// Matrix product `a * b'`.
pub fn matmul_nt(a: &Mat<f64>, b: &Mat<f64>) -> Mat<f64> {
    let (n, k) = (a.nrows(), a.ncols());
    let p = b.nrows();
    debug_assert_eq!(k, b.ncols());

    let mut out = Mat::zeros(n, p);
    for i in 0..n {
        for j in 0..p {
            let mut sum = 0.0;
            for l in 0..k {
                sum += a[(i, l)] * b[(j, l)];
            }
            out[(i, j)] = sum;
        }
    }
    out
}

/// Matrix-vector product `a * v`.
pub fn matvec(a: &Mat<f64>, v: &Col<f64>) -> Col<f64> {
    let (n, k) = (a.nrows(), a.ncols());
    debug_assert_eq!(k, v.nrows());

    let mut out = Col::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for l in 0..k {
            sum += a[(i, l)] * v[l];
        }
        out[i] = sum;
    }
    out
}

/// Matrix-vector product `a' * v`.
pub fn matvec_tn(a: &Mat<f64>, v: &Col<f64>) -> Col<f64> {
    let (n, k) = (a.nrows(), a.ncols());
    debug_assert_eq!(n, v.nrows());

    let mut out = Col::zeros(k);
    for j in 0..k {
        let mut sum = 0.0;
        for l in 0..n {
            sum += a[(l, j)] * v[l];
        }
        out[j] = sum;
    }
    out
}

/// Dot product of two vectors.
pub fn dot(a: &Col<f64>, b: &Col<f64>) -> f64 {
    debug_assert_eq!(a.nrows(), b.nrows());
    let mut sum = 0.0;
    for i in 0..a.nrows() {
        sum += a[i] * b[i];
    }
    sum
}

/// Euclidean norm of a vector.
pub fn norm(a: &Col<f64>) -> f64 {
    dot(a, a).sqrt()
}

/// Sum of squares of all matrix entries.
pub fn sum_of_squares(m: &Mat<f64>) -> f64 {
    let mut sum = 0.0;
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            sum += m[(i, j)] * m[(i, j)];
        }
    }
    sum
}

/// Elementwise difference `a - b`.
pub fn sub(a: &Mat<f64>, b: &Mat<f64>) -> Mat<f64> {
    debug_assert_eq!(a.nrows(), b.nrows());
    debug_assert_eq!(a.ncols(), b.ncols());
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| a[(i, j)] - b[(i, j)])
}

/// Select rows of a matrix by index.
pub fn take_rows(m: &Mat<f64>, rows: &[usize]) -> Mat<f64> {
    Mat::from_fn(rows.len(), m.ncols(), |i, j| m[(rows[i], j)])
}

/// Copy of the first `n_cols` columns.
pub fn take_cols(m: &Mat<f64>, n_cols: usize) -> Mat<f64> {
    debug_assert!(n_cols <= m.ncols());
    Mat::from_fn(m.nrows(), n_cols, |i, j| m[(i, j)])
}

/// Extract one column as a vector.
pub fn column(m: &Mat<f64>, j: usize) -> Col<f64> {
    Col::from_fn(m.nrows(), |i| m[(i, j)])
}

/// Concatenate a leading column with the columns of a matrix.
pub fn prepend_column(first: &Col<f64>, rest: &Mat<f64>) -> Mat<f64> {
    debug_assert!(rest.ncols() == 0 || first.nrows() == rest.nrows());
    Mat::from_fn(first.nrows(), rest.ncols() + 1, |i, j| {
        if j == 0 {
            first[i]
        } else {
            rest[(i, j - 1)]
        }
    })
}

/// L1 distance between a reference column and a (possibly negated) column.
pub fn l1_column_distance(
    a: &Mat<f64>,
    col_a: usize,
    b: &Mat<f64>,
    col_b: usize,
    negate_b: bool,
) -> f64 {
    debug_assert_eq!(a.nrows(), b.nrows());
    let sign = if negate_b { -1.0 } else { 1.0 };
    let mut sum = 0.0;
    for i in 0..a.nrows() {
        sum += (a[(i, col_a)] - sign * b[(i, col_b)]).abs();
    }
    sum
}

/// Mean and (population) standard deviation of a slice of scalars.
pub fn mean_stdev(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

/// Elementwise mean and standard deviation across a stack of equally sized matrices.
pub fn mean_stdev_mats(stack: &[Mat<f64>]) -> (Mat<f64>, Mat<f64>) {
    let n = stack.len();
    debug_assert!(n > 0);
    let (rows, cols) = (stack[0].nrows(), stack[0].ncols());

    let mut mean: Mat<f64> = Mat::zeros(rows, cols);
    for m in stack {
        for i in 0..rows {
            for j in 0..cols {
                mean[(i, j)] += m[(i, j)];
            }
        }
    }
    for i in 0..rows {
        for j in 0..cols {
            mean[(i, j)] /= n as f64;
        }
    }

    let mut stdev: Mat<f64> = Mat::zeros(rows, cols);
    for m in stack {
        for i in 0..rows {
            for j in 0..cols {
                stdev[(i, j)] += (m[(i, j)] - mean[(i, j)]).powi(2);
            }
        }
    }
    for i in 0..rows {
        for j in 0..cols {
            stdev[(i, j)] = (stdev[(i, j)] / n as f64).sqrt();
        }
    }

    (mean, stdev)
}

/// Elementwise mean and standard deviation across a stack of equally sized vectors.
pub fn mean_stdev_vecs(stack: &[Col<f64>]) -> (Col<f64>, Col<f64>) {
    let n = stack.len();
    debug_assert!(n > 0);
    let len = stack[0].nrows();

    let mut mean: Col<f64> = Col::zeros(len);
    for c in stack {
        for i in 0..len {
            mean[i] += c[i];
        }
    }
    for i in 0..len {
        mean[i] /= n as f64;
    }

    let mut stdev: Col<f64> = Col::zeros(len);
    for c in stack {
        for i in 0..len {
            stdev[i] += (c[i] - mean[i]).powi(2);
        }
    }
    for i in 0..len {
        stdev[i] = (stdev[i] / n as f64).sqrt();
    }

    (mean, stdev)
}
