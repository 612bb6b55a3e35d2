//! Error types for the positioning platform.
//!
//! Expected outcomes of normal operation (too few matched access points,
//! optimizer non-convergence, empty input) are not errors: they surface as
//! `None` or empty results. [`GeoError`] covers caller and configuration
//! mistakes that should fail fast.

use thiserror::Error;

/// Result type for fallible platform operations
pub type GeoResult<T> = Result<T, GeoError>;

#[derive(Error, Debug)]
pub enum GeoError {
    /// A configuration or call parameter is out of its valid range
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Two parallel inputs disagree in length
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GeoError {
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        GeoError::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Check that a parameter is finite and strictly positive
pub(crate) fn ensure_positive(parameter: &str, value: f64) -> GeoResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeoError::invalid_parameter(parameter, value, "must be finite and greater than zero"))
    }
}
