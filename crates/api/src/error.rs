use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use railwatch_core::error::CoreError;
use railwatch_pipeline::PipelineError;
use railwatch_store::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `railwatch_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Core(err.into())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Core(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::UnreadableVideo(msg) => {
                    (StatusCode::BAD_REQUEST, "UNREADABLE_VIDEO", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::JobAlreadyRunning(_) => (
                    StatusCode::CONFLICT,
                    "JOB_ALREADY_RUNNING",
                    core.to_string(),
                ),
                CoreError::StoreUnavailable(msg) => {
                    tracing::warn!(error = %msg, "Alert store unavailable");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "STORE_UNAVAILABLE",
                        "The alert store is unavailable".to_string(),
                    )
                }
                CoreError::InferenceUnavailable(msg) => {
                    tracing::warn!(error = %msg, "Inference unavailable");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "INFERENCE_UNAVAILABLE",
                        "The detection model is unavailable".to_string(),
                    )
                }
                CoreError::InferenceTimeout(_) => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "INFERENCE_TIMEOUT",
                    core.to_string(),
                ),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use railwatch_core::types::JobId;

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn domain_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(StoreError::RecordNotFound("k".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(StoreError::Validation("cabin is required".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StoreError::InvalidTransition("resolved -> pending".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::Unavailable("connection reset".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(PipelineError::JobAlreadyRunning("v".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PipelineError::JobNotFound(JobId::nil()).into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let response = AppError::from(CoreError::Internal("stack trace".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
