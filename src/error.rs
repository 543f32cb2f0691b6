//! Error types for the anofox-signals library.

use thiserror::Error;

/// Result type alias for detection and forecasting operations.
pub type Result<T> = std::result::Result<T, SignalError>;

/// Errors that can occur while preparing, scoring or forecasting a series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    /// A configuration value violates its constraint.
    ///
    /// `parameter` is the name of the offending configuration field.
    #[error("invalid configuration `{parameter}`: {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String,
    },

    /// The series is shorter than the engine's minimum.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A fit produced non-finite values that could not be recovered locally.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    /// Two aligned sequences have different lengths.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Points handed to an ordered constructor are not sorted by date.
    #[error("series is not ordered by date at index {index}")]
    Unordered { index: usize },
}

impl SignalError {
    /// Shorthand for a [`SignalError::Configuration`] error.
    pub fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        SignalError::Configuration {
            parameter,
            reason: reason.into(),
        }
    }

    /// Whether this error reports an invalid configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SignalError::Configuration { .. })
    }

    /// Name of the configuration field that was rejected, if any.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            SignalError::Configuration { parameter, .. } => Some(parameter),
            _ => None,
        }
    }
}
