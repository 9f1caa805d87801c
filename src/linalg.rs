//! Small dense solvers bridging `ndarray` views to `nalgebra`.
//!
//! The fitting code keeps its data in `ndarray` containers; the two
//! factorizations it needs (SVD least squares for the NNLS passive set,
//! Cholesky for the ADMM x-update) come from `nalgebra`.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

// ---------------------------------------------------------------------------
// Least squares on a column subset
// ---------------------------------------------------------------------------

/// Solve `min ||A[:, columns] s - b||²` and return `s` (one entry per column).
///
/// Singular values below `max(sv) * max(m, k) * eps` are treated as zero,
/// which gives the minimum-norm solution for rank-deficient subsets.
pub(crate) fn lstsq_columns(
    a: &ArrayView2<'_, f64>,
    columns: &[usize],
    b: &ArrayView1<'_, f64>,
) -> Array1<f64> {
    let m = a.nrows();
    let k = columns.len();
    if k == 0 {
        return Array1::zeros(0);
    }
    if m == 0 {
        return Array1::zeros(k);
    }

    let sub = DMatrix::from_fn(m, k, |i, j| a[[i, columns[j]]]);
    let rhs = DVector::from_iterator(m, b.iter().copied());

    let svd = sub.svd(true, true);
    let sv_max = svd.singular_values.max();
    let eps = sv_max * (m.max(k) as f64) * f64::EPSILON;

    let s = svd.solve(&rhs, eps).expect("U and V were requested");
    Array1::from_iter(s.iter().copied())
}

// ---------------------------------------------------------------------------
// Regularized normal equations: (AᵀA + ρI) X = B
// ---------------------------------------------------------------------------

/// Cholesky factor of `AᵀA + ρI`, reused for every ADMM iteration.
pub(crate) struct RegularizedGram {
    chol: Cholesky<f64, Dyn>,
}

impl RegularizedGram {
    /// Factor `AᵀA + rate·I`. Returns `None` if the matrix is not positive
    /// definite, which with `rate > 0` only happens for non-finite input.
    pub(crate) fn new(gram: &ArrayView2<'_, f64>, rate: f64) -> Option<Self> {
        let n = gram.nrows();
        let m = DMatrix::from_fn(n, n, |i, j| {
            let diag = if i == j { rate } else { 0.0 };
            gram[[i, j]] + diag
        });
        Cholesky::new(m).map(|chol| RegularizedGram { chol })
    }

    /// Solve for every column of `rhs` at once.
    pub(crate) fn solve(&self, rhs: &Array2<f64>) -> Array2<f64> {
        let (n, cols) = rhs.dim();
        let b = DMatrix::from_fn(n, cols, |i, j| rhs[[i, j]]);
        let x = self.chol.solve(&b);
        Array2::from_shape_fn((n, cols), |(i, j)| x[(i, j)])
    }
}
