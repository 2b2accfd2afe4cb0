use railwatch_core::error::CoreError;

/// Errors raised by store backends and writers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// The backing store could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid record: {0}")]
    Validation(String),

    #[error("{0}")]
    InvalidTransition(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordNotFound(key) => CoreError::NotFound {
                entity: "Record",
                id: key,
            },
            StoreError::Unavailable(msg) => CoreError::StoreUnavailable(msg),
            StoreError::Validation(msg) => CoreError::Validation(msg),
            StoreError::InvalidTransition(msg) => CoreError::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn maps_onto_core_errors() {
        assert_matches!(
            CoreError::from(StoreError::RecordNotFound("k1".into())),
            CoreError::NotFound { id, .. } if id == "k1"
        );
        assert_matches!(
            CoreError::from(StoreError::Unavailable("down".into())),
            CoreError::StoreUnavailable(_)
        );
        assert_matches!(
            CoreError::from(StoreError::InvalidTransition("x".into())),
            CoreError::Conflict(_)
        );
    }
}
