//! Job scheduling entry point.

use std::sync::Arc;

use railwatch_core::detection::FallClassifier;
use railwatch_core::sampler::FrameSampler;
use railwatch_core::types::JobId;
use railwatch_core::video::VideoAsset;
use railwatch_events::EventBus;
use railwatch_inference::InferenceAdapter;
use railwatch_store::AlertStore;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::job::{JobHandle, JobStatus};
use crate::registry::JobRegistry;
use crate::runner::JobRunner;

/// Everything a running job needs, shared between jobs.
pub(crate) struct SchedulerContext {
    pub(crate) sampler: FrameSampler,
    pub(crate) adapter: Arc<InferenceAdapter>,
    pub(crate) classifier: FallClassifier,
    pub(crate) store: Arc<dyn AlertStore>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) config: PipelineConfig,
    pub(crate) registry: JobRegistry,
}

/// Starts and tracks processing jobs. Cheap to clone.
///
/// Each job runs on its own task; jobs for different videos run
/// concurrently and share only the alert store.
#[derive(Clone)]
pub struct ProcessingScheduler {
    ctx: Arc<SchedulerContext>,
}

impl ProcessingScheduler {
    pub fn new(
        sampler: FrameSampler,
        adapter: Arc<InferenceAdapter>,
        store: Arc<dyn AlertStore>,
        bus: Arc<EventBus>,
        config: PipelineConfig,
    ) -> Self {
        let classifier = FallClassifier::new(config.fall_threshold);
        Self {
            ctx: Arc::new(SchedulerContext {
                sampler,
                adapter,
                classifier,
                store,
                bus,
                config,
                registry: JobRegistry::default(),
            }),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.ctx.config
    }

    /// Start analysing `video`.
    ///
    /// Fails immediately with [`PipelineError::Sampler`] for an unreadable
    /// video and with [`PipelineError::JobAlreadyRunning`] while another job
    /// for the same video is running.
    pub fn start(&self, video: VideoAsset) -> Result<JobHandle, PipelineError> {
        let frames = self
            .ctx
            .sampler
            .sample(&video, self.ctx.config.frame_interval_secs)?;
        let entry = self
            .ctx
            .registry
            .reserve(&video.locator, frames.total_frames())?;
        let handle = entry.handle();

        let runner = JobRunner::new(Arc::clone(&self.ctx), entry, video);
        tokio::spawn(runner.run(frames));

        Ok(handle)
    }

    /// Handle for a known job.
    pub fn job(&self, id: JobId) -> Result<JobHandle, PipelineError> {
        self.ctx
            .registry
            .get(id)
            .map(|entry| entry.handle())
            .ok_or(PipelineError::JobNotFound(id))
    }

    pub fn status(&self, id: JobId) -> Result<JobStatus, PipelineError> {
        self.ctx
            .registry
            .get(id)
            .map(|entry| entry.snapshot())
            .ok_or(PipelineError::JobNotFound(id))
    }

    /// All tracked jobs, most recently started first.
    pub fn list(&self) -> Vec<JobStatus> {
        let mut jobs: Vec<JobStatus> = self
            .ctx
            .registry
            .all()
            .iter()
            .map(|entry| entry.snapshot())
            .collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        jobs
    }

    /// Request cancellation of a job. Cancelling a finished job is a no-op.
    pub fn cancel(&self, id: JobId) -> Result<JobStatus, PipelineError> {
        let entry = self
            .ctx
            .registry
            .get(id)
            .ok_or(PipelineError::JobNotFound(id))?;
        let status = entry.snapshot();
        if !status.state.is_terminal() {
            tracing::info!(job_id = %id, video = %status.video, "Cancellation requested");
            entry.cancel.cancel();
        }
        Ok(status)
    }

    pub fn running_count(&self) -> usize {
        self.ctx.registry.running_count()
    }

    /// Cancel every running job.
    pub fn shutdown(&self) {
        let mut cancelled = 0;
        for entry in self.ctx.registry.all() {
            if !entry.snapshot().state.is_terminal() {
                entry.cancel.cancel();
                cancelled += 1;
            }
        }
        tracing::info!(cancelled, "Processing scheduler shut down");
    }
}
