use ndarray::{Array1, Array2, ArrayView, ArrayView1, ArrayView2, Axis, Dimension, Ix2};

use crate::error::{FitError, Result};
use crate::fit::layout::require_rank;
use crate::fit::model::{NnlsFit, NnlsOptions};
use crate::fit::rfactor::rfactor_columns;
use crate::linalg::lstsq_columns;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Non-negative least squares fit of every pixel column of `data`.
///
/// `data` is `(n_channels, n_pixels)`, `references` is
/// `(n_channels, n_references)`. Each pixel is solved independently with
/// the Lawson–Hanson active-set method.
pub fn fit_nnls<D1, D2>(
    data: ArrayView<'_, f64, D1>,
    references: ArrayView<'_, f64, D2>,
    options: &NnlsOptions,
) -> Result<NnlsFit>
where
    D1: Dimension,
    D2: Dimension,
{
    let (data, references) = check_batch(data, references)?;
    options.validate()?;

    let n_refs = references.ncols();
    let n_pixels = data.ncols();
    let maxiter = options.resolved_maxiter(n_refs);
    log::debug!("nnls: {n_pixels} pixel(s), {n_refs} reference(s), maxiter={maxiter}");

    let solver = ActiveSet::new(references, maxiter);

    let mut weights = Array2::zeros((n_refs, n_pixels));
    let mut residual = Array1::zeros(n_pixels);
    let mut capped = 0usize;

    for (px, spectrum) in data.axis_iter(Axis(1)).enumerate() {
        let solution = solver.solve(spectrum);
        if solution.exhausted {
            capped += 1;
        }
        weights.column_mut(px).assign(&solution.x);
        residual[px] = solution.residual_norm;
    }

    if capped > 0 {
        log::warn!("nnls: {capped} of {n_pixels} pixel(s) reached maxiter={maxiter}");
    }

    let rfactor = rfactor_columns(data, weights.view(), references);
    Ok(NnlsFit {
        weights,
        rfactor,
        residual,
    })
}

/// Shared shape validation for the batch solvers.
pub(crate) fn check_batch<'a, 'b, D1, D2>(
    data: ArrayView<'a, f64, D1>,
    references: ArrayView<'b, f64, D2>,
) -> Result<(ArrayView2<'a, f64>, ArrayView2<'b, f64>)>
where
    D1: Dimension,
    D2: Dimension,
{
    let data = require_rank::<_, Ix2>(data, "data")?;
    let references = require_rank::<_, Ix2>(references, "ref_spectra")?;
    if data.nrows() != references.nrows() {
        return Err(FitError::ChannelMismatch {
            data: data.nrows(),
            references: references.nrows(),
        });
    }
    if references.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite { name: "ref_spectra" });
    }
    Ok((data, references))
}

// ---------------------------------------------------------------------------
// Lawson–Hanson active set
// ---------------------------------------------------------------------------

struct Solution {
    x: Array1<f64>,
    residual_norm: f64,
    exhausted: bool,
}

/// Per-reference-matrix state reused across pixels.
struct ActiveSet<'a> {
    a: ArrayView2<'a, f64>,
    maxiter: usize,
    tol: f64,
}

impl<'a> ActiveSet<'a> {
    fn new(a: ArrayView2<'a, f64>, maxiter: usize) -> Self {
        let (m, n) = a.dim();
        // Largest column L1 norm, as in the classic NNLS tolerance.
        let norm1 = a
            .axis_iter(Axis(1))
            .map(|col| col.iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0, f64::max);
        let tol = 10.0 * f64::EPSILON * norm1 * (m.max(n) as f64);
        ActiveSet { a, maxiter, tol }
    }

    /// Gradient of `-½||Ax - b||²`, i.e. `Aᵀ(b - Ax)`.
    fn dual(&self, x: &Array1<f64>, b: &ArrayView1<'_, f64>) -> Array1<f64> {
        let r = b - &self.a.dot(x);
        self.a.t().dot(&r)
    }

    /// Unconstrained solution on the passive set, zero elsewhere.
    fn passive_solution(&self, passive: &[bool], b: &ArrayView1<'_, f64>) -> Array1<f64> {
        let columns: Vec<usize> = passive
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p)
            .map(|(j, _)| j)
            .collect();
        let sub = lstsq_columns(&self.a, &columns, b);
        let mut s = Array1::zeros(passive.len());
        for (&j, &v) in columns.iter().zip(sub.iter()) {
            s[j] = v;
        }
        s
    }

    fn solve(&self, b: ArrayView1<'_, f64>) -> Solution {
        let n = self.a.ncols();
        let mut x = Array1::<f64>::zeros(n);
        let mut passive = vec![false; n];
        let mut iter = 0usize;
        let mut exhausted = false;

        let mut w = self.dual(&x, &b);

        'outer: loop {
            // Most promising variable still held at zero.
            let candidate = (0..n)
                .filter(|&j| !passive[j] && w[j] > self.tol)
                .max_by(|&i, &j| w[i].total_cmp(&w[j]));
            let Some(j) = candidate else {
                break;
            };
            if iter >= self.maxiter {
                exhausted = true;
                break;
            }
            iter += 1;
            passive[j] = true;

            let mut s = self.passive_solution(&passive, &b);

            // Step back towards x until every passive coefficient is positive.
            while (0..n).any(|i| passive[i] && s[i] <= 0.0) {
                if iter >= self.maxiter {
                    exhausted = true;
                    break 'outer;
                }
                iter += 1;

                let alpha = (0..n)
                    .filter(|&i| passive[i] && s[i] <= 0.0)
                    .map(|i| {
                        let step = x[i] - s[i];
                        if step > 0.0 {
                            x[i] / step
                        } else {
                            0.0
                        }
                    })
                    .fold(f64::INFINITY, f64::min);

                x.zip_mut_with(&s, |xi, &si| *xi += alpha * (si - *xi));
                for i in 0..n {
                    if passive[i] && x[i] <= self.tol {
                        passive[i] = false;
                        x[i] = 0.0;
                    }
                }
                s = self.passive_solution(&passive, &b);
            }

            x = s;
            w = self.dual(&x, &b);
        }

        // The interpolation step keeps x feasible; clamp rounding leftovers.
        x.mapv_inplace(|v| v.max(0.0));
        let residual_norm = (&b - &self.a.dot(&x)).mapv(|v| v * v).sum().sqrt();

        Solution {
            x,
            residual_norm,
            exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{gaussian_references, SimpleRng};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    fn dataset(n_pixels: usize, seed: u64) -> (Array2<f64>, Array2<f64>, Array2<f64>) {
        let x = Array1::linspace(0.0, 100.0, 101);
        let refs = gaussian_references(&x, &[20.0, 50.0, 80.0], &[10.0, 12.0, 15.0]);
        let mut rng = SimpleRng::new(seed);
        let weights = Array2::from_shape_fn((3, n_pixels), |_| rng.uniform(0.1, 1.0));
        let data = refs.dot(&weights);
        (refs, weights, data)
    }

    #[test]
    fn recovers_noise_free_weights() {
        for n_pixels in [8, 15] {
            let (refs, weights, data) = dataset(n_pixels, 3);
            let fit = fit_nnls(data.view(), refs.view(), &NnlsOptions::default()).unwrap();

            assert_eq!(fit.weights.dim(), (3, n_pixels));
            for (got, want) in fit.weights.iter().zip(weights.iter()) {
                assert_abs_diff_eq!(*got, *want, epsilon = 1e-10);
            }
            assert_eq!(fit.rfactor.len(), n_pixels);
            assert_eq!(fit.residual.len(), n_pixels);
            assert!(fit.rfactor.iter().all(|&r| r < 1e-10));
        }
    }

    #[test]
    fn residual_is_euclidean_norm() {
        let (refs, _, mut data) = dataset(4, 11);
        // Push pixel 0 away from the reference span.
        data[[0, 0]] += 0.5;
        data[[60, 0]] -= 0.25;
        let fit = fit_nnls(data.view(), refs.view(), &NnlsOptions::default()).unwrap();

        let fitted = refs.dot(&fit.weights.column(0));
        let res: Array1<f64> = &fitted - &data.column(0);
        let norm = res.mapv(|v| v * v).sum().sqrt();
        assert_abs_diff_eq!(fit.residual[0], norm, epsilon = 1e-12);

        let rf = res.mapv(f64::abs).sum() / data.column(0).mapv(f64::abs).sum();
        assert_abs_diff_eq!(fit.rfactor[0], rf, epsilon = 1e-12);
        assert!(fit.residual[0] > 0.0);
    }

    #[test]
    fn clamps_negative_coefficients_to_zero() {
        // b = 2·a0 - 1·a1 cannot be matched with x >= 0.
        let refs = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let data = array![[2.0], [-1.0], [1.0]];
        let fit = fit_nnls(data.view(), refs.view(), &NnlsOptions::default()).unwrap();

        assert_eq!(fit.weights[[1, 0]], 0.0);
        // Best fit of [2, -1, 1] by t·[1, 0, 1] is t = 1.5.
        assert_abs_diff_eq!(fit.weights[[0, 0]], 1.5, epsilon = 1e-12);
        assert!(fit.weights.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn zero_pixel_gives_zero_weights() {
        let (refs, _, _) = dataset(1, 1);
        let data = Array2::zeros((101, 2));
        let fit = fit_nnls(data.view(), refs.view(), &NnlsOptions::default()).unwrap();
        assert!(fit.weights.iter().all(|&w| w == 0.0));
        assert_eq!(fit.rfactor[0], 0.0);
        assert_eq!(fit.residual[1], 0.0);
    }

    #[test]
    fn maxiter_is_validated() {
        let (refs, _, data) = dataset(8, 5);
        assert!(fit_nnls(data.view(), refs.view(), &NnlsOptions::with_maxiter(10)).is_ok());
        assert!(matches!(
            fit_nnls(data.view(), refs.view(), &NnlsOptions::with_maxiter(0)),
            Err(FitError::NonPositive { name: "maxiter", .. })
        ));
    }

    #[test]
    fn exhausted_cap_keeps_feasible_iterate() {
        let (refs, _, data) = dataset(2, 9);
        let fit = fit_nnls(data.view(), refs.view(), &NnlsOptions::with_maxiter(1)).unwrap();
        assert!(fit.weights.iter().all(|&w| w >= 0.0));
        // Only one reference could enter the passive set.
        for col in fit.weights.axis_iter(Axis(1)) {
            assert!(col.iter().filter(|&&w| w > 0.0).count() <= 1);
        }
    }

    #[test]
    fn rejects_bad_shapes() {
        let (n_pts, n_refs, n_pixels) = (10, 3, 5);

        let flat = Array1::<f64>::zeros(n_pts);
        let refs = Array2::<f64>::zeros((n_pts, n_refs));
        assert!(matches!(
            fit_nnls(flat.view(), refs.view(), &NnlsOptions::default()),
            Err(FitError::Rank { name: "data", .. })
        ));

        let data = Array2::<f64>::zeros((n_pts, n_pixels));
        assert!(matches!(
            fit_nnls(data.view(), flat.view(), &NnlsOptions::default()),
            Err(FitError::Rank { name: "ref_spectra", .. })
        ));

        let short = Array2::<f64>::zeros((n_pts - 1, n_pixels));
        let err = fit_nnls(short.view(), refs.view(), &NnlsOptions::default()).unwrap_err();
        assert_eq!(
            err,
            FitError::ChannelMismatch {
                data: 9,
                references: 10
            }
        );
    }

    #[test]
    fn rejects_non_finite_references() {
        let mut refs = Array2::<f64>::ones((4, 2));
        refs[[2, 1]] = f64::NAN;
        let data = Array2::<f64>::ones((4, 1));
        assert!(matches!(
            fit_nnls(data.view(), refs.view(), &NnlsOptions::default()),
            Err(FitError::NonFinite { name: "ref_spectra" })
        ));
    }
}
