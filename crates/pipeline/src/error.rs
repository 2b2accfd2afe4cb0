use railwatch_core::error::CoreError;
use railwatch_core::sampler::SamplerError;
use railwatch_core::types::JobId;

/// Errors surfaced to callers of the scheduler. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A job for the same video is still running.
    #[error("a processing job is already running for video {0}")]
    JobAlreadyRunning(String),

    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error("job {0} not found")]
    JobNotFound(JobId),
}

impl From<PipelineError> for CoreError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::JobAlreadyRunning(video) => CoreError::JobAlreadyRunning(video),
            PipelineError::Sampler(e) => e.into(),
            PipelineError::JobNotFound(id) => CoreError::NotFound {
                entity: "Job",
                id: id.to_string(),
            },
        }
    }
}
