use ndarray::{Array1, Array2, ArrayView, Dimension};

use crate::error::{FitError, Result};
use crate::fit::model::{AdmmFit, AdmmOptions};
use crate::fit::nnls::check_batch;
use crate::fit::rfactor::rfactor_columns;
use crate::linalg::RegularizedGram;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Non-negative least squares by ADMM, for a whole batch of pixels at once.
///
/// The problem `min ½||A w - y||² s.t. w >= 0` is split as
///
/// ```text
/// x ← (AᵀA + ρI)⁻¹ (Aᵀy + ρ(z - u))
/// z ← max(x + u, 0)
/// u ← u + x - z
/// ```
///
/// with `ρ = options.rate`. All pixels advance together and share one
/// stopping decision, so the returned traces have one entry per executed
/// iteration:
///
/// * `convergence`: mean over pixels of `||Δ(z + u)||²`. This is the
///   fixed-point residual of the underlying Douglas–Rachford iteration and
///   is non-increasing.
/// * `feasibility`: mean over pixels of `||x - z||²`, the distance between
///   the unconstrained iterate and its non-negative copy.
///
/// Iteration stops once `convergence < epsilon` or after `maxiter` steps.
/// Weights are taken from `z` and are therefore never negative.
pub fn fit_admm<D1, D2>(
    data: ArrayView<'_, f64, D1>,
    references: ArrayView<'_, f64, D2>,
    options: &AdmmOptions,
) -> Result<AdmmFit>
where
    D1: Dimension,
    D2: Dimension,
{
    let (data, references) = check_batch(data, references)?;
    options.validate()?;

    let AdmmOptions {
        maxiter,
        rate,
        epsilon,
    } = *options;
    let n_refs = references.ncols();
    let n_pixels = data.ncols();
    log::debug!(
        "admm: {n_pixels} pixel(s), {n_refs} reference(s), maxiter={maxiter}, rate={rate}, epsilon={epsilon:e}"
    );

    let gram = references.t().dot(&references);
    let aty = references.t().dot(&data);
    let factor = RegularizedGram::new(&gram.view(), rate)
        .ok_or(FitError::NonFinite { name: "ref_spectra" })?;

    let scale = 1.0 / n_pixels.max(1) as f64;
    let mut z = Array2::<f64>::zeros((n_refs, n_pixels));
    let mut u = Array2::<f64>::zeros((n_refs, n_pixels));
    let mut convergence = Vec::new();
    let mut feasibility = Vec::new();
    let mut converged = false;

    for _ in 0..maxiter {
        let rhs = &aty + &((&z - &u) * rate);
        let x = factor.solve(&rhs);

        // z + u moves from (z, u) to x + u, so its step is x - z.
        let step = squared_norm(&(&x - &z)) * scale;

        let z_next = (&x + &u).mapv(|v| v.max(0.0));
        let gap = &x - &z_next;
        u += &gap;
        z = z_next;

        convergence.push(step);
        feasibility.push(squared_norm(&gap) * scale);

        if step < epsilon {
            converged = true;
            break;
        }
    }

    let iterations = convergence.len();
    let last = convergence.last().copied().unwrap_or(f64::NAN);
    if converged {
        log::debug!("admm: converged after {iterations} iteration(s), convergence={last:e}");
    } else {
        log::warn!(
            "admm: stopped at maxiter={maxiter} with convergence={last:e} (epsilon={epsilon:e})"
        );
    }

    let rfactor = rfactor_columns(data, z.view(), references);
    Ok(AdmmFit {
        weights: z,
        rfactor,
        convergence: Array1::from(convergence),
        feasibility: Array1::from(feasibility),
    })
}

fn squared_norm(m: &Array2<f64>) -> f64 {
    m.iter().map(|v| v * v).sum()
}
