use std::path::Path;

use anyhow::{Context, Result};

use crate::fit::model::{FitOptions, FitOptionsDocument};

// ---------------------------------------------------------------------------
// Loading fit options from disk
// ---------------------------------------------------------------------------

impl FitOptions {
    /// Load options from a JSON document. Missing fields take their
    /// defaults; unknown methods and malformed values are rejected here,
    /// non-positive values on the first fit.
    ///
    /// ```json
    /// { "method": "admm", "axis": 0, "maxiter": 200, "rate": 0.2 }
    /// ```
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading options file {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Syntax errors carry serde's location; an unknown method or a
    /// non-positive `maxiter` comes back as the matching
    /// [`FitError`](crate::FitError) under the context.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: FitOptionsDocument =
            serde_json::from_str(text).context("parsing fit options JSON")?;
        let options = FitOptions::try_from(document).context("invalid fit options")?;
        Ok(options)
    }

    /// Same as [`from_json_str`](Self::from_json_str), then checks every
    /// parameter that is set.
    pub fn from_json_str_validated(text: &str) -> Result<Self> {
        let options = Self::from_json_str(text)?;
        options.validate().context("invalid fit options")?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FitError;
    use crate::fit::model::FitMethod;

    #[test]
    fn parses_partial_document() {
        let opts = FitOptions::from_json_str(r#"{ "method": "admm", "maxiter": 250 }"#).unwrap();
        assert_eq!(opts.method, FitMethod::Admm);
        assert_eq!(opts.maxiter, Some(250));
        assert_eq!(opts.axis, 0);
        assert_eq!(opts.rate, None);
    }

    #[test]
    fn unknown_method_is_an_unsupported_method_error() {
        let err = FitOptions::from_json_str(r#"{ "method": "lasso" }"#).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("invalid fit options"), "{msg}");
        assert_eq!(
            err.downcast_ref::<FitError>(),
            Some(&FitError::UnsupportedMethod("lasso".into()))
        );
    }

    #[test]
    fn negative_maxiter_names_the_parameter() {
        let err = FitOptions::from_json_str_validated(r#"{ "maxiter": -5 }"#).unwrap_err();
        assert_eq!(
            err.downcast_ref::<FitError>(),
            Some(&FitError::NonPositive {
                name: "maxiter",
                value: -5.0
            })
        );
        assert!(format!("{err:#}").contains("'maxiter' is zero or negative"));

        let err = FitOptions::from_json_str(r#"{ "method": "admm", "maxiter": 0 }"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FitError>(),
            Some(FitError::NonPositive { name: "maxiter", .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = FitOptions::from_json_str(r#"{ "maxiter": "ten" }"#).unwrap_err();
        assert!(format!("{err:#}").contains("parsing fit options JSON"));
        assert!(err.downcast_ref::<FitError>().is_none());
    }

    #[test]
    fn validation_names_bad_parameter() {
        let err = FitOptions::from_json_str_validated(r#"{ "epsilon": 0.0 }"#).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("'epsilon' is zero or negative"), "{msg}");
    }

    #[test]
    fn missing_file_names_path() {
        let err = FitOptions::from_json_file(Path::new("/nonexistent/options.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/options.json"));
    }

    #[test]
    fn round_trips_through_json() {
        let opts = FitOptions::new(FitMethod::Admm).axis(-1).rate(0.5);
        let text = serde_json::to_string(&opts).unwrap();
        assert!(!text.contains("maxiter"));
        assert_eq!(FitOptions::from_json_str(&text).unwrap(), opts);
    }
}
