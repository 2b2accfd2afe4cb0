//! The per-job frame loop.
//!
//! Frames are processed strictly in time order. Cancellation is checked at
//! every frame boundary: before a frame is decoded and again before it is
//! handed to inference. An inference call already in flight is allowed to
//! finish.

use std::sync::Arc;

use railwatch_core::detection::{FallJudgment, FALL_ALERT_TYPE};
use railwatch_core::job_events::{
    EVENT_ALERT_EMITTED, EVENT_JOB_CANCELLED, EVENT_JOB_COMPLETED, EVENT_JOB_FAILED,
    EVENT_JOB_PROGRESS, EVENT_JOB_STARTED,
};
use railwatch_core::records::Alert;
use railwatch_core::sampler::FrameSequence;
use railwatch_core::scheduling::JobState;
use railwatch_core::types::JobId;
use railwatch_core::video::{Frame, VideoAsset};
use railwatch_events::PipelineEvent;
use railwatch_store::writer::append_alert;

use crate::job::JobEntry;
use crate::scheduler::SchedulerContext;

/// How a job's frame loop ended.
#[derive(Debug)]
enum Outcome {
    Completed,
    Cancelled,
    Failed(String),
}

pub(crate) struct JobRunner {
    ctx: Arc<SchedulerContext>,
    entry: Arc<JobEntry>,
    video: VideoAsset,
    job_id: JobId,
}

impl JobRunner {
    pub(crate) fn new(ctx: Arc<SchedulerContext>, entry: Arc<JobEntry>, video: VideoAsset) -> Self {
        let job_id = entry.snapshot().id;
        Self {
            ctx,
            entry,
            video,
            job_id,
        }
    }

    pub(crate) async fn run(self, mut frames: FrameSequence) {
        tracing::info!(
            job_id = %self.job_id,
            video = %self.video.locator,
            total_frames = frames.total_frames(),
            "Processing job started",
        );
        self.publish(EVENT_JOB_STARTED, serde_json::json!({
            "total_frames": frames.total_frames(),
            "duration_secs": self.video.duration_secs,
        }));

        let outcome = self.process_frames(&mut frames).await;
        // Release decoder resources before reporting the outcome.
        drop(frames);
        self.finish(outcome);
    }

    async fn process_frames(&self, frames: &mut FrameSequence) -> Outcome {
        let cancel = &self.entry.cancel;
        let max_failures = self.ctx.config.max_consecutive_failures;
        let mut consecutive_failures = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Cancelled,
                frame = frames.next_frame() => frame,
            };
            let Some(frame) = next else {
                return Outcome::Completed;
            };

            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }

            match self.ctx.adapter.detect(&frame).await {
                Ok(detections) => {
                    consecutive_failures = 0;
                    let judgment = self.ctx.classifier.classify(&detections);
                    if judgment.is_fall {
                        self.emit_alert(&frame, judgment).await;
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        job_id = %self.job_id,
                        offset_secs = frame.offset_secs,
                        consecutive_failures,
                        error = %e,
                        "Inference failed for frame",
                    );
                    if consecutive_failures >= max_failures {
                        return Outcome::Failed(format!(
                            "{consecutive_failures} consecutive inference failures, last: {e}"
                        ));
                    }
                }
            }

            self.report_progress(frames.position(), frame.offset_secs);
        }
    }

    async fn emit_alert(&self, frame: &Frame, judgment: FallJudgment) {
        let alert = Alert::new(
            FALL_ALERT_TYPE,
            self.ctx.config.alert_location.clone(),
            chrono::Utc::now(),
            Some(self.video.locator.clone()),
        );

        match append_alert(self.ctx.store.as_ref(), &alert).await {
            Ok(key) => {
                self.entry
                    .status
                    .send_modify(|status| status.alerts_emitted += 1);
                tracing::info!(
                    job_id = %self.job_id,
                    key = %key,
                    offset_secs = frame.offset_secs,
                    confidence = judgment.confidence,
                    "Fall alert emitted",
                );
                self.publish(EVENT_ALERT_EMITTED, serde_json::json!({
                    "key": key,
                    "offset_secs": frame.offset_secs,
                    "confidence": judgment.confidence,
                    "alert": alert,
                }));
            }
            Err(e) => {
                // Not retried; the job carries on with the next frame.
                tracing::error!(
                    job_id = %self.job_id,
                    offset_secs = frame.offset_secs,
                    error = %e,
                    "Failed to append fall alert",
                );
            }
        }
    }

    fn report_progress(&self, frames_processed: usize, cursor_secs: f64) {
        self.entry
            .status
            .send_modify(|status| status.advance(frames_processed, cursor_secs));
        let status = self.entry.snapshot();
        self.publish(EVENT_JOB_PROGRESS, serde_json::json!({
            "progress": status.progress,
            "frames_processed": status.frames_processed,
            "total_frames": status.total_frames,
            "cursor_secs": status.cursor_secs,
        }));
    }

    fn finish(&self, outcome: Outcome) {
        let (state, event, error) = match outcome {
            Outcome::Completed => (JobState::Completed, EVENT_JOB_COMPLETED, None),
            Outcome::Cancelled => (JobState::Cancelled, EVENT_JOB_CANCELLED, None),
            Outcome::Failed(reason) => (JobState::Failed, EVENT_JOB_FAILED, Some(reason)),
        };

        // Terminal first: once the state is visible the registry treats the
        // video as free, so the old job is never observed Running next to
        // its replacement.
        self.entry.status.send_modify(|status| {
            if state == JobState::Completed {
                let total = status.total_frames;
                let cursor = status.cursor_secs.unwrap_or(0.0);
                status.advance(total, cursor);
            }
            status.error = error.clone();
            status.transition(state);
        });
        self.ctx.registry.finish(self.job_id, &self.video.locator);

        let status = self.entry.snapshot();
        match state {
            JobState::Failed => tracing::error!(
                job_id = %self.job_id,
                error = error.as_deref().unwrap_or_default(),
                "Processing job failed",
            ),
            _ => tracing::info!(
                job_id = %self.job_id,
                state = %state,
                alerts_emitted = status.alerts_emitted,
                "Processing job finished",
            ),
        }
        self.publish(event, serde_json::json!({
            "state": state,
            "progress": status.progress,
            "alerts_emitted": status.alerts_emitted,
            "error": status.error,
        }));
    }

    fn publish(&self, event_type: &str, payload: serde_json::Value) {
        self.ctx.bus.publish(
            PipelineEvent::new(event_type)
                .with_job(self.job_id)
                .with_video(self.video.locator.clone())
                .with_payload(payload),
        );
    }
}
