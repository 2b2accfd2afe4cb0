#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unreadable video: {0}")]
    UnreadableVideo(String),

    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Inference timed out after {0:?}")]
    InferenceTimeout(std::time::Duration),

    #[error("A processing job is already running for video {0}")]
    JobAlreadyRunning(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
