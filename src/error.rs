use thiserror::Error;

/// Kalman engine error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Model dimension error: {0}")]
    ModelDimension(String),

    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    #[error("Singular {matrix} covariance at step {step}")]
    SingularCovariance { matrix: &'static str, step: usize },

    #[error("Trace length mismatch: {states} states vs {covariances} covariances")]
    TraceLengthMismatch { states: usize, covariances: usize },

    #[error("Trace shape mismatch at step {step}: {detail}")]
    TraceShapeMismatch { step: usize, detail: String },

    #[error("Invalid engine setting: {0}")]
    InvalidSetting(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        let err = EngineError::SingularCovariance {
            matrix: "innovation",
            step: 3,
        };
        assert_eq!(err.to_string(), "Singular innovation covariance at step 3");

        let err = EngineError::TraceLengthMismatch {
            states: 4,
            covariances: 2,
        };
        assert!(err.to_string().contains("4 states vs 2 covariances"));
    }
}
