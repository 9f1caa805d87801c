use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayD};
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// ADMM iteration cap when none is given.
pub const DEFAULT_ADMM_MAXITER: usize = 100;
/// ADMM penalty coefficient ρ when none is given.
pub const DEFAULT_ADMM_RATE: f64 = 0.2;
/// ADMM stopping threshold on the (squared) convergence measure.
pub const DEFAULT_ADMM_EPSILON: f64 = 1e-30;

// ---------------------------------------------------------------------------
// FitMethod – which solver back-end to run
// ---------------------------------------------------------------------------

/// Closed set of solver back-ends. Both share the same input/output shape
/// contract, so the dispatcher can swap them freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum FitMethod {
    /// Direct active-set non-negative least squares (Lawson–Hanson).
    #[default]
    Nnls,
    /// Alternating direction method of multipliers.
    Admm,
}

impl FitMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMethod::Nnls => "nnls",
            FitMethod::Admm => "admm",
        }
    }
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitMethod {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nnls" => Ok(FitMethod::Nnls),
            "admm" => Ok(FitMethod::Admm),
            other => Err(FitError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl TryFrom<String> for FitMethod {
    type Error = FitError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Parameter checks shared by the solvers
// ---------------------------------------------------------------------------

pub(crate) fn check_maxiter(maxiter: usize) -> Result<()> {
    if maxiter == 0 {
        return Err(FitError::NonPositive {
            name: "maxiter",
            value: 0.0,
        });
    }
    Ok(())
}

/// NaN fails too, since it is not `> 0`.
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(FitError::NonPositive { name, value })
    }
}

// ---------------------------------------------------------------------------
// Solver options
// ---------------------------------------------------------------------------

/// Options for [`fit_nnls`](crate::fit::nnls::fit_nnls).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NnlsOptions {
    /// Active-set iteration cap per pixel. `None` means `3 * n_references`.
    pub maxiter: Option<usize>,
}

impl NnlsOptions {
    pub fn with_maxiter(maxiter: usize) -> Self {
        NnlsOptions {
            maxiter: Some(maxiter),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.maxiter {
            Some(maxiter) => check_maxiter(maxiter),
            None => Ok(()),
        }
    }

    pub(crate) fn resolved_maxiter(&self, n_references: usize) -> usize {
        self.maxiter.unwrap_or(3 * n_references.max(1))
    }
}

/// Options for [`fit_admm`](crate::fit::admm::fit_admm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmmOptions {
    /// Hard cap on iterations.
    pub maxiter: usize,
    /// Penalty coefficient ρ of the augmented Lagrangian.
    pub rate: f64,
    /// Stop once the convergence measure falls below this value.
    pub epsilon: f64,
}

impl Default for AdmmOptions {
    fn default() -> Self {
        Self {
            maxiter: DEFAULT_ADMM_MAXITER,
            rate: DEFAULT_ADMM_RATE,
            epsilon: DEFAULT_ADMM_EPSILON,
        }
    }
}

impl AdmmOptions {
    pub fn validate(&self) -> Result<()> {
        check_maxiter(self.maxiter)?;
        check_positive("rate", self.rate)?;
        check_positive("epsilon", self.epsilon)
    }
}

// ---------------------------------------------------------------------------
// FitOptions – everything the dispatcher needs, loadable from JSON
// ---------------------------------------------------------------------------

/// Dispatcher options. Absent solver parameters fall back to the
/// selected solver's defaults.
///
/// ```json
/// { "method": "admm", "axis": -1, "maxiter": 200, "rate": 0.2, "epsilon": 1e-30 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "FitOptionsDocument")]
pub struct FitOptions {
    pub method: FitMethod,
    /// Spectral axis of the observation array; negative values count from
    /// the end.
    pub axis: isize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxiter: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
}

impl FitOptions {
    pub fn new(method: FitMethod) -> Self {
        FitOptions {
            method,
            ..Default::default()
        }
    }

    pub fn axis(mut self, axis: isize) -> Self {
        self.axis = axis;
        self
    }

    pub fn maxiter(mut self, maxiter: usize) -> Self {
        self.maxiter = Some(maxiter);
        self
    }

    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Check every parameter that is set, whichever method is selected.
    pub fn validate(&self) -> Result<()> {
        if let Some(maxiter) = self.maxiter {
            check_maxiter(maxiter)?;
        }
        if let Some(rate) = self.rate {
            check_positive("rate", rate)?;
        }
        if let Some(epsilon) = self.epsilon {
            check_positive("epsilon", epsilon)?;
        }
        Ok(())
    }

    pub fn nnls_options(&self) -> NnlsOptions {
        NnlsOptions {
            maxiter: self.maxiter,
        }
    }

    pub fn admm_options(&self) -> AdmmOptions {
        let defaults = AdmmOptions::default();
        AdmmOptions {
            maxiter: self.maxiter.unwrap_or(defaults.maxiter),
            rate: self.rate.unwrap_or(defaults.rate),
            epsilon: self.epsilon.unwrap_or(defaults.epsilon),
        }
    }
}

/// Wire form of [`FitOptions`]. The method stays a string and `maxiter`
/// is signed until conversion, where bad values become [`FitError`]s.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FitOptionsDocument {
    method: Option<String>,
    axis: isize,
    maxiter: Option<i64>,
    rate: Option<f64>,
    epsilon: Option<f64>,
}

impl TryFrom<FitOptionsDocument> for FitOptions {
    type Error = FitError;

    fn try_from(doc: FitOptionsDocument) -> Result<Self> {
        let method = match doc.method {
            Some(name) => name.parse()?,
            None => FitMethod::default(),
        };
        let maxiter = match doc.maxiter {
            Some(n) if n <= 0 => {
                return Err(FitError::NonPositive {
                    name: "maxiter",
                    value: n as f64,
                })
            }
            Some(n) => Some(n as usize),
            None => None,
        };
        Ok(FitOptions {
            method,
            axis: doc.axis,
            maxiter,
            rate: doc.rate,
            epsilon: doc.epsilon,
        })
    }
}

// ---------------------------------------------------------------------------
// Solver outputs (batch form: one column per pixel)
// ---------------------------------------------------------------------------

/// Result of [`fit_nnls`](crate::fit::nnls::fit_nnls).
#[derive(Debug, Clone)]
pub struct NnlsFit {
    /// `(n_references, n_pixels)`, all entries `>= 0`.
    pub weights: Array2<f64>,
    /// R-factor per pixel.
    pub rfactor: Array1<f64>,
    /// Euclidean norm of the fit residual per pixel.
    pub residual: Array1<f64>,
}

/// Result of [`fit_admm`](crate::fit::admm::fit_admm).
#[derive(Debug, Clone)]
pub struct AdmmFit {
    /// `(n_references, n_pixels)`, all entries `>= 0`.
    pub weights: Array2<f64>,
    /// R-factor per pixel.
    pub rfactor: Array1<f64>,
    /// One value per executed iteration, shared by the whole batch.
    pub convergence: Array1<f64>,
    /// Same length as `convergence`.
    pub feasibility: Array1<f64>,
}

impl AdmmFit {
    /// Number of iterations actually run.
    pub fn iterations(&self) -> usize {
        self.convergence.len()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher output (source pixel layout restored)
// ---------------------------------------------------------------------------

/// Method-specific diagnostics returned by the dispatcher.
#[derive(Debug, Clone)]
pub enum Diagnostics {
    Nnls {
        /// Shaped like the pixel dimensions of the observation array.
        residual: ArrayD<f64>,
    },
    Admm {
        convergence: Array1<f64>,
        feasibility: Array1<f64>,
    },
}

impl Diagnostics {
    pub fn method(&self) -> FitMethod {
        match self {
            Diagnostics::Nnls { .. } => FitMethod::Nnls,
            Diagnostics::Admm { .. } => FitMethod::Admm,
        }
    }
}

/// Result of [`fit_spectrum`](crate::fit::dispatch::fit_spectrum).
#[derive(Debug, Clone)]
pub struct SpectrumFit {
    /// Observation shape with the spectral axis replaced by the reference axis.
    pub weights: ArrayD<f64>,
    /// Observation shape with the spectral axis removed (0-D for a single spectrum).
    pub rfactor: ArrayD<f64>,
    pub diagnostics: Diagnostics,
}

impl SpectrumFit {
    pub fn method(&self) -> FitMethod {
        self.diagnostics.method()
    }
}
