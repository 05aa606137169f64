//! Error taxonomy for the location engine.
//!
//! Business-rule violations are not errors here: the validator reports them
//! as messages and the façade surfaces them through [`PredictError::Rejected`].

use crate::validator::ValidationOutcome;
use thiserror::Error;

/// Malformed categorical or numeric input supplied by the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("unknown restaurant category '{0}'")]
    UnknownCategory(String),

    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// The injected classifier (or the scaler in front of it) failed or produced
/// output the engine cannot interpret.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("classifier failed: {0}")]
    Classifier(String),

    #[error("classifier returned {got} probabilities, expected {expected}")]
    ClassCountMismatch { expected: usize, got: usize },

    #[error("classifier returned malformed probabilities: {0}")]
    MalformedOutput(String),

    #[error("scaler expects {expected} features, got {got}")]
    ScalerMismatch { expected: usize, got: usize },

    #[error("no label mapped to class index {0}")]
    UnknownClass(usize),
}

/// Invalid district reference data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistrictError {
    #[error("district '{key}': {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error("duplicate district key '{0}'")]
    DuplicateKey(String),

    #[error("unknown district '{0}'")]
    NotFound(String),
}

/// Everything that can stop a single prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("prediction rejected: {}", .0.errors.join("; "))]
    Rejected(ValidationOutcome),

    #[error(transparent)]
    Input(#[from] EncodeError),

    #[error(transparent)]
    District(#[from] DistrictError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// The validation outcome for a rejected prediction.
    pub fn outcome(&self) -> Option<&ValidationOutcome> {
        match self {
            PredictError::Rejected(outcome) => Some(outcome),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_joins_errors() {
        let outcome = ValidationOutcome {
            warnings: vec!["w".to_string()],
            errors: vec!["first".to_string(), "second".to_string()],
        };
        let err = PredictError::Rejected(outcome);

        assert_eq!(err.to_string(), "prediction rejected: first; second");
        assert_eq!(err.outcome().map(|o| o.errors.len()), Some(2));
    }

    #[test]
    fn test_input_error_is_transparent() {
        let err: PredictError = EncodeError::UnknownCategory("Warteg".to_string()).into();
        assert_eq!(err.to_string(), "unknown restaurant category 'Warteg'");
        assert!(err.outcome().is_none());
    }
}
