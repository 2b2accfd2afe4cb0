//! Job status snapshots and handles.

use railwatch_core::scheduling::JobState;
use railwatch_core::types::{JobId, Timestamp};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Point-in-time view of a processing job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub id: JobId,
    /// Locator of the video being processed.
    pub video: String,
    pub state: JobState,
    pub total_frames: usize,
    /// Frame offsets consumed so far, including skipped frames.
    pub frames_processed: usize,
    /// Offset of the last frame analysed, in seconds.
    pub cursor_secs: Option<f64>,
    /// Fraction of frames processed, in `[0, 1]`. Never decreases.
    pub progress: f64,
    pub alerts_emitted: u32,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl JobStatus {
    pub(crate) fn new(id: JobId, video: String, total_frames: usize) -> Self {
        Self {
            id,
            video,
            state: JobState::Idle,
            total_frames,
            frames_processed: 0,
            cursor_secs: None,
            progress: 0.0,
            alerts_emitted: 0,
            error: None,
            started_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    /// Move to `to`, refusing transitions the state machine does not allow.
    pub(crate) fn transition(&mut self, to: JobState) -> bool {
        match self.state.validate_transition(to) {
            Ok(()) => {
                self.state = to;
                if to.is_terminal() {
                    self.finished_at = Some(chrono::Utc::now());
                }
                true
            }
            Err(msg) => {
                tracing::error!(job_id = %self.id, error = %msg, "Rejected job state transition");
                false
            }
        }
    }

    /// Record that `frames_processed` offsets have been consumed.
    pub(crate) fn advance(&mut self, frames_processed: usize, cursor_secs: f64) {
        self.frames_processed = self.frames_processed.max(frames_processed);
        self.cursor_secs = Some(cursor_secs);
        if self.total_frames > 0 {
            let fraction = self.frames_processed as f64 / self.total_frames as f64;
            self.progress = self.progress.max(fraction.min(1.0));
        }
    }
}

/// Registry-side state of one job.
#[derive(Debug)]
pub(crate) struct JobEntry {
    pub(crate) status: watch::Sender<JobStatus>,
    pub(crate) cancel: CancellationToken,
}

impl JobEntry {
    pub(crate) fn new(status: JobStatus) -> Self {
        let (tx, _) = watch::channel(status);
        Self {
            status: tx,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn snapshot(&self) -> JobStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn handle(&self) -> JobHandle {
        let id = self.status.borrow().id;
        JobHandle {
            id,
            status: self.status.subscribe(),
            cancel: self.cancel.clone(),
        }
    }
}

/// Caller-side handle to a started job.
#[derive(Clone, Debug)]
pub struct JobHandle {
    id: JobId,
    status: watch::Receiver<JobStatus>,
    cancel: CancellationToken,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status.borrow().clone()
    }

    pub fn progress(&self) -> f64 {
        self.status.borrow().progress
    }

    /// Watch status changes as they happen.
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.status.clone()
    }

    /// Request cancellation. Honoured at the next frame boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the job reaches a terminal state.
    pub async fn wait(&self) -> JobStatus {
        let mut rx = self.status.clone();
        let finished = rx
            .wait_for(|status| status.state.is_terminal())
            .await
            .map(|status| status.clone());
        match finished {
            Ok(status) => status,
            Err(_) => rx.borrow().clone(),
        }
    }
}
