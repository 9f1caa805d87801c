use ndarray::{ArrayView, Dimension, Ix2};

use crate::error::{FitError, Result};
use crate::fit::admm::fit_admm;
use crate::fit::layout::{normalize_axis, require_rank, PixelBatch};
use crate::fit::model::{Diagnostics, FitMethod, FitOptions, SpectrumFit};
use crate::fit::nnls::fit_nnls;

// ---------------------------------------------------------------------------
// fit_spectrum – any rank, any spectral axis
// ---------------------------------------------------------------------------

/// Fit an observation array of any rank against a reference matrix.
///
/// `options.axis` selects the spectral axis of `data` (negative values
/// count from the end); every other axis is a pixel dimension. The result
/// keeps the pixel layout:
///
/// * `weights`: `data`'s shape with the spectral axis replaced by the
///   reference axis, so `(n_references, *pixel_dims)` for `axis = 0`;
/// * `rfactor` and NNLS `residual`: shaped `pixel_dims` (0-D for a single
///   spectrum);
/// * ADMM `convergence`/`feasibility`: 1-D, shared by all pixels.
///
/// Checks run in this order: axis range, reference rank, channel count,
/// then every solver parameter set in `options`.
pub fn fit_spectrum<D1, D2>(
    data: ArrayView<'_, f64, D1>,
    references: ArrayView<'_, f64, D2>,
    options: &FitOptions,
) -> Result<SpectrumFit>
where
    D1: Dimension,
    D2: Dimension,
{
    let data = data.into_dyn();
    let axis = normalize_axis(options.axis, data.ndim())?;

    let references = require_rank::<_, Ix2>(references, "ref_spectra")?;
    check_channels(data.shape()[axis], references.nrows())?;
    options.validate()?;

    let batch = PixelBatch::from_array(data, axis);
    log::debug!(
        "fit_spectrum: method={}, axis={axis}, pixel shape {:?} ({} pixel(s))",
        options.method,
        batch.pixel_shape,
        batch.n_pixels()
    );

    let fit = match options.method {
        FitMethod::Nnls => {
            let fit = fit_nnls(batch.matrix.view(), references, &options.nnls_options())?;
            SpectrumFit {
                weights: batch.restore_leading(fit.weights),
                rfactor: batch.restore_pixels(fit.rfactor),
                diagnostics: Diagnostics::Nnls {
                    residual: batch.restore_pixels(fit.residual),
                },
            }
        }
        FitMethod::Admm => {
            let fit = fit_admm(batch.matrix.view(), references, &options.admm_options())?;
            SpectrumFit {
                weights: batch.restore_leading(fit.weights),
                rfactor: batch.restore_pixels(fit.rfactor),
                diagnostics: Diagnostics::Admm {
                    convergence: fit.convergence,
                    feasibility: fit.feasibility,
                },
            }
        }
    };
    Ok(fit)
}

/// [`fit_spectrum`] with the method given by name (`"nnls"` or `"admm"`).
///
/// The name is checked after the shape checks, so a bad axis is reported
/// before a bad method.
pub fn fit_spectrum_with<D1, D2>(
    data: ArrayView<'_, f64, D1>,
    references: ArrayView<'_, f64, D2>,
    method: &str,
    options: &FitOptions,
) -> Result<SpectrumFit>
where
    D1: Dimension,
    D2: Dimension,
{
    let data = data.into_dyn();
    let axis = normalize_axis(options.axis, data.ndim())?;
    let references = require_rank::<_, Ix2>(references, "ref_spectra")?;
    check_channels(data.shape()[axis], references.nrows())?;

    let options = FitOptions {
        method: method.parse()?,
        ..*options
    };
    fit_spectrum(data, references, &options)
}

fn check_channels(data: usize, references: usize) -> Result<()> {
    if data != references {
        return Err(FitError::ChannelMismatch { data, references });
    }
    Ok(())
}
