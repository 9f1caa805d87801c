//! Array layout helpers: rank checks and the permute → reshape → inverse
//! permute round trip that turns an N-D observation array into a
//! `(n_channels, n_pixels)` batch and back.

use ndarray::{Array1, Array2, ArrayD, ArrayView, ArrayViewD, Dimension, IxDyn};

use crate::error::{FitError, Result};

// ---------------------------------------------------------------------------
// Rank checks
// ---------------------------------------------------------------------------

/// Reinterpret `array` as rank `E`, failing with [`FitError::Rank`].
pub(crate) fn require_rank<'a, D, E>(
    array: ArrayView<'a, f64, D>,
    name: &'static str,
) -> Result<ArrayView<'a, f64, E>>
where
    D: Dimension,
    E: Dimension,
{
    let found = array.ndim();
    array
        .into_dimensionality::<E>()
        .map_err(|_| FitError::Rank {
            name,
            expected: E::NDIM.unwrap_or(found),
            found,
        })
}

// ---------------------------------------------------------------------------
// Axis normalization
// ---------------------------------------------------------------------------

/// Map a possibly negative axis index onto `0..ndim`.
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let n = ndim as isize;
    let resolved = if axis < 0 { axis + n } else { axis };
    if (0..n).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(FitError::AxisOutOfRange { axis, ndim })
    }
}

/// Axis order that brings `axis` to the front, keeping the others in order.
fn front_order(axis: usize, ndim: usize) -> Vec<usize> {
    std::iter::once(axis)
        .chain((0..ndim).filter(|&i| i != axis))
        .collect()
}

/// Inverse of [`front_order`]: the leading axis goes back to `axis`.
fn back_order(axis: usize, ndim: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (1..ndim).collect();
    order.insert(axis, 0);
    order
}

/// Reshape `(leading, n_pixels)` to `(leading, *pixel_shape)` and move the
/// leading axis to `axis`.
pub(crate) fn leading_to_axis(
    matrix: Array2<f64>,
    pixel_shape: &[usize],
    axis: usize,
) -> ArrayD<f64> {
    let mut shape = Vec::with_capacity(pixel_shape.len() + 1);
    shape.push(matrix.nrows());
    shape.extend_from_slice(pixel_shape);

    let values: Vec<f64> = matrix.iter().copied().collect();
    let front = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .expect("leading * n_pixels elements");

    front
        .permuted_axes(IxDyn(&back_order(axis, shape.len())))
        .as_standard_layout()
        .into_owned()
}

// ---------------------------------------------------------------------------
// PixelBatch – the flattened form handed to the solvers
// ---------------------------------------------------------------------------

/// An observation array flattened to `(n_channels, n_pixels)`, together with
/// what is needed to undo the flattening.
#[derive(Debug, Clone)]
pub struct PixelBatch {
    /// Spectral axis first, every other axis flattened in C order.
    pub matrix: Array2<f64>,
    /// Shape of the pixel dimensions (empty for a single spectrum).
    pub pixel_shape: Vec<usize>,
    /// Resolved (non-negative) spectral axis of the source array.
    pub axis: usize,
}

impl PixelBatch {
    /// Flatten `data` around `axis`. The axis must already be normalized.
    pub fn from_array(data: ArrayViewD<'_, f64>, axis: usize) -> Self {
        let ndim = data.ndim();
        let n_channels = data.shape()[axis];
        let pixel_shape: Vec<usize> = data
            .shape()
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != axis)
            .map(|(_, &len)| len)
            .collect();
        let n_pixels: usize = pixel_shape.iter().product();

        let permuted = data.permuted_axes(IxDyn(&front_order(axis, ndim)));
        // `iter` walks logical order, so the flattening is independent of
        // the source memory layout.
        let values: Vec<f64> = permuted.iter().copied().collect();
        let matrix = Array2::from_shape_vec((n_channels, n_pixels), values)
            .expect("element count equals n_channels * n_pixels");

        PixelBatch {
            matrix,
            pixel_shape,
            axis,
        }
    }

    pub fn n_pixels(&self) -> usize {
        self.matrix.ncols()
    }

    /// Restore a per-pixel vector to the pixel shape. A single spectrum
    /// gives a 0-D array.
    pub fn restore_pixels(&self, values: Array1<f64>) -> ArrayD<f64> {
        let values = values.to_vec();
        ArrayD::from_shape_vec(IxDyn(&self.pixel_shape), values)
            .expect("one value per pixel")
    }

    /// Restore a `(leading, n_pixels)` matrix so that its leading axis sits
    /// where the spectral axis was in the source array.
    pub fn restore_leading(&self, matrix: Array2<f64>) -> ArrayD<f64> {
        leading_to_axis(matrix, &self.pixel_shape, self.axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Axis};

    #[test]
    fn normalize_axis_accepts_negative_indices() {
        assert_eq!(normalize_axis(0, 3).unwrap(), 0);
        assert_eq!(normalize_axis(-1, 3).unwrap(), 2);
        assert_eq!(normalize_axis(-3, 3).unwrap(), 0);
    }

    #[test]
    fn normalize_axis_rejects_out_of_range() {
        assert_eq!(
            normalize_axis(3, 3),
            Err(FitError::AxisOutOfRange { axis: 3, ndim: 3 })
        );
        assert_eq!(
            normalize_axis(-4, 3),
            Err(FitError::AxisOutOfRange { axis: -4, ndim: 3 })
        );
        assert!(normalize_axis(0, 0).is_err());
    }

    #[test]
    fn back_order_undoes_front_order() {
        for ndim in 1..5 {
            for axis in 0..ndim {
                let front = front_order(axis, ndim);
                let back = back_order(axis, ndim);
                // result axis i of the round trip is source axis front[back[i]]
                let round_trip: Vec<usize> = back.iter().map(|&k| front[k]).collect();
                assert_eq!(round_trip, (0..ndim).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn flattening_keeps_spectra_together() {
        // shape (3, 4, 2) with spectral axis 1: pixel (i, k) holds 100i + 10c + k
        let data = Array::from_shape_fn((3, 4, 2), |(i, c, k)| (100 * i + 10 * c + k) as f64)
            .into_dyn();
        let batch = PixelBatch::from_array(data.view(), 1);

        assert_eq!(batch.matrix.dim(), (4, 6));
        assert_eq!(batch.pixel_shape, vec![3, 2]);
        // pixel index 3 = (i=1, k=1)
        let column: Vec<f64> = batch.matrix.column(3).to_vec();
        assert_eq!(column, vec![101.0, 111.0, 121.0, 131.0]);
    }

    #[test]
    fn restore_leading_puts_axis_back() {
        let data = Array::from_shape_fn((3, 4, 2), |(i, c, k)| (100 * i + 10 * c + k) as f64)
            .into_dyn();
        let batch = PixelBatch::from_array(data.view(), 1);
        let restored = batch.restore_leading(batch.matrix.clone());
        assert_eq!(restored, data);

        // a different leading length keeps its position
        let narrower = batch.matrix.select(Axis(0), &[0, 2]);
        let restored = batch.restore_leading(narrower);
        assert_eq!(restored.shape(), &[3, 2, 2]);
        assert_eq!(restored[[2, 1, 1]], 221.0);
    }

    #[test]
    fn single_spectrum_restores_to_zero_dim() {
        let data = Array1::from(vec![1.0, 2.0, 3.0]).into_dyn();
        let batch = PixelBatch::from_array(data.view(), 0);
        assert_eq!(batch.n_pixels(), 1);
        assert!(batch.pixel_shape.is_empty());

        let scalar = batch.restore_pixels(Array1::from(vec![0.5]));
        assert_eq!(scalar.ndim(), 0);
        assert_eq!(scalar[IxDyn(&[])], 0.5);
    }

    #[test]
    fn non_contiguous_input_is_flattened_logically() {
        let data = Array::from_shape_fn((4, 3), |(c, p)| (10 * c + p) as f64);
        let transposed = data.t().to_owned().into_dyn(); // (3, 4), axis 1 spectral
        let view = data.t().into_dyn(); // same values, Fortran layout
        let a = PixelBatch::from_array(transposed.view(), 1);
        let b = PixelBatch::from_array(view, 1);
        assert_eq!(a.matrix, b.matrix);
        assert_eq!(a.matrix, data);
    }

    #[test]
    fn require_rank_reports_found_rank() {
        let m = Array2::<f64>::zeros((2, 2));
        let err = require_rank::<_, ndarray::Ix1>(m.view(), "data").unwrap_err();
        assert_eq!(
            err,
            FitError::Rank {
                name: "data",
                expected: 1,
                found: 2
            }
        );
    }
}
