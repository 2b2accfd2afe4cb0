use std::time::Duration;

use railwatch_core::error::CoreError;

/// Per-call inference failures. Both are non-fatal to a processing job on
/// their own.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InferenceError {
    /// The model could not be loaded or invoked.
    #[error("inference unavailable: {0}")]
    Unavailable(String),

    /// A single call exceeded the configured deadline.
    #[error("inference timed out after {0:?}")]
    Timeout(Duration),
}

impl From<InferenceError> for CoreError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Unavailable(msg) => CoreError::InferenceUnavailable(msg),
            InferenceError::Timeout(after) => CoreError::InferenceTimeout(after),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = InferenceError::Unavailable("connection refused".into());
        assert!(err.to_string().contains("inference unavailable"));
        assert!(err.to_string().contains("connection refused"));

        let err = InferenceError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "inference timed out after 10s");
    }

    #[test]
    fn converts_into_core_error() {
        assert!(matches!(
            CoreError::from(InferenceError::Timeout(Duration::from_millis(5))),
            CoreError::InferenceTimeout(d) if d == Duration::from_millis(5)
        ));
        assert!(matches!(
            CoreError::from(InferenceError::Unavailable("x".into())),
            CoreError::InferenceUnavailable(_)
        ));
    }
}
