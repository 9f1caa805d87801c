use ndarray::{Array1, ArrayView, ArrayView1, ArrayView2, Axis, Dimension, Ix1, Ix2};

use crate::error::{FitError, Result};
use crate::fit::layout::require_rank;

// ---------------------------------------------------------------------------
// R-factor: sum(|spectrum - refs @ weights|) / sum(|spectrum|)
// ---------------------------------------------------------------------------

/// Goodness of fit of `weights` against an observed `spectrum`.
///
/// ```text
/// rfactor = Σ |spectrum - references · weights| / Σ |spectrum|
/// ```
///
/// `spectrum` must be 1-D, `weights` 1-D with one entry per reference
/// column, and `references` 2-D `(n_channels, n_references)` with
/// `n_channels == spectrum.len()`.
///
/// An all-zero spectrum yields `0.0` if the fit is exact and `+inf`
/// otherwise.
pub fn rfactor<D1, D2, D3>(
    spectrum: ArrayView<'_, f64, D1>,
    weights: ArrayView<'_, f64, D2>,
    references: ArrayView<'_, f64, D3>,
) -> Result<f64>
where
    D1: Dimension,
    D2: Dimension,
    D3: Dimension,
{
    let spectrum = require_rank::<_, Ix1>(spectrum, "spectrum")?;
    let weights = require_rank::<_, Ix1>(weights, "weights")?;
    let references = require_rank::<_, Ix2>(references, "ref_spectra")?;

    if spectrum.len() != references.nrows() {
        return Err(FitError::ChannelMismatch {
            data: spectrum.len(),
            references: references.nrows(),
        });
    }
    if weights.len() != references.ncols() {
        return Err(FitError::WeightCount {
            weights: weights.len(),
            references: references.ncols(),
        });
    }

    Ok(rfactor_unchecked(spectrum, weights, references))
}

pub(crate) fn rfactor_unchecked(
    spectrum: ArrayView1<'_, f64>,
    weights: ArrayView1<'_, f64>,
    references: ArrayView2<'_, f64>,
) -> f64 {
    let fitted = references.dot(&weights);
    let residual: f64 = spectrum
        .iter()
        .zip(fitted.iter())
        .map(|(s, f)| (s - f).abs())
        .sum();
    let total: f64 = spectrum.iter().map(|s| s.abs()).sum();

    if total == 0.0 {
        if residual == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        residual / total
    }
}

/// R-factor for every pixel column of a batch.
pub(crate) fn rfactor_columns(
    data: ArrayView2<'_, f64>,
    weights: ArrayView2<'_, f64>,
    references: ArrayView2<'_, f64>,
) -> Array1<f64> {
    data.axis_iter(Axis(1))
        .zip(weights.axis_iter(Axis(1)))
        .map(|(spectrum, w)| rfactor_unchecked(spectrum, w, references))
        .collect()
}
