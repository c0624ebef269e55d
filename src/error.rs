//! Error types for the valuation engine
//!
//! Only input problems surface as errors. Numeric degeneracy inside a valuation
//! degrades to a defined value plus a log line (see the individual calculators).

use thiserror::Error;

/// A specialized Result type for engine operations.
pub type EngineResult<T> = Result<T, ValuationError>;

/// Errors that can occur before or around a valuation
#[derive(Debug, Error)]
pub enum ValuationError {
    /// Participant state is out of range or logically inconsistent
    #[error("Invalid participant state: {field} - {reason}")]
    InvalidState { field: String, reason: String },

    /// Mortality table code not known to the provider
    #[error("Unknown mortality table: {code}")]
    UnknownMortalityTable { code: String },

    /// Parallel vectors passed to a present-value routine disagree in length
    #[error("Length mismatch: cash flows have {left} entries, survival has {right}")]
    LengthMismatch { left: usize, right: usize },

    /// Mortality table file is malformed
    #[error("Malformed mortality table {code}: {reason}")]
    MalformedTable { code: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ValuationError {
    /// Shorthand for an input validation failure
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValuationError::InvalidState {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was raised by input validation
    pub fn is_validation(&self) -> bool {
        matches!(self, ValuationError::InvalidState { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message() {
        let err = ValuationError::invalid("age", "must be positive");
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Invalid participant state: age - must be positive"
        );
    }

    #[test]
    fn test_length_mismatch_is_not_validation() {
        let err = ValuationError::LengthMismatch { left: 3, right: 4 };
        assert!(!err.is_validation());
    }
}
