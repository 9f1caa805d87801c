//! Non-negative spectral unmixing.
//!
//! Decomposes a measured spectrum, or a stack of spectra with one per
//! pixel, into a non-negative combination of fixed reference spectra and
//! reports the R-factor of the fit. Two solvers are available (direct
//! NNLS and iterative ADMM) behind one dispatcher that works along any
//! axis of an N-dimensional array.
//!
//! ```no_run
//! use ndarray::Array2;
//! use rusty_unmix::{fit_spectrum, FitMethod, FitOptions};
//!
//! let references = Array2::<f64>::zeros((101, 3));
//! let map = ndarray::Array3::<f64>::zeros((101, 16, 16));
//! let fit = fit_spectrum(map.view(), references.view(), &FitOptions::new(FitMethod::Admm))?;
//! assert_eq!(fit.weights.shape(), &[3, 16, 16]);
//! # Ok::<(), rusty_unmix::FitError>(())
//! ```

pub mod config;
pub mod error;
pub mod fit;
mod linalg;
pub mod synth;

pub use error::{FitError, Result};
pub use fit::admm::fit_admm;
pub use fit::dispatch::{fit_spectrum, fit_spectrum_with};
pub use fit::model::{
    AdmmFit, AdmmOptions, Diagnostics, FitMethod, FitOptions, NnlsFit, NnlsOptions, SpectrumFit,
};
pub use fit::nnls::fit_nnls;
pub use fit::rfactor::rfactor;
