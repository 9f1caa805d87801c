use thiserror::Error;

// ---------------------------------------------------------------------------
// FitError – every way a fit can be rejected
// ---------------------------------------------------------------------------

/// Validation failures raised before any numeric work starts.
///
/// Each precondition has its own variant so callers can tell a bad array
/// shape from a bad solver parameter without parsing messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// An input array has the wrong number of dimensions.
    #[error("array '{name}' must have {expected} dimension(s), got {found}")]
    Rank {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    /// Spectral-axis lengths of the observations and the references differ.
    #[error("number of spectrum points in data ({data}) and references ({references}) do not match")]
    ChannelMismatch { data: usize, references: usize },

    /// The weight vector does not have one entry per reference column.
    #[error("number of weights ({weights}) and reference spectra ({references}) do not match")]
    WeightCount { weights: usize, references: usize },

    /// The requested spectral axis is not a dimension of the observations.
    #[error(
        "axis {axis} does not exist in data array with {ndim} dimension(s) (valid range: {lo}..={hi})",
        lo = axis_floor(.ndim),
        hi = axis_ceiling(.ndim)
    )]
    AxisOutOfRange { axis: isize, ndim: usize },

    /// A solver parameter that must be strictly positive is not.
    #[error("parameter '{name}' is zero or negative ({value})")]
    NonPositive { name: &'static str, value: f64 },

    /// Reference spectra contain NaN or infinite values.
    #[error("array '{name}' contains non-finite values")]
    NonFinite { name: &'static str },

    /// A fitting method literal other than `nnls` or `admm`.
    #[error("fitting method '{0}' is not supported (expected 'nnls' or 'admm')")]
    UnsupportedMethod(String),
}

pub type Result<T> = std::result::Result<T, FitError>;

fn axis_floor(ndim: &usize) -> isize {
    -(*ndim as isize)
}

fn axis_ceiling(ndim: &usize) -> isize {
    *ndim as isize - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_message_names_valid_range() {
        let err = FitError::AxisOutOfRange { axis: 3, ndim: 3 };
        assert_eq!(
            err.to_string(),
            "axis 3 does not exist in data array with 3 dimension(s) (valid range: -3..=2)"
        );
    }

    #[test]
    fn non_positive_message_names_parameter() {
        let err = FitError::NonPositive {
            name: "rate",
            value: -0.2,
        };
        assert!(err.to_string().contains("'rate' is zero or negative"));
    }
}
