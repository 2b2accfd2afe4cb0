//! Job bookkeeping: at most one running job per video, plus a bounded
//! history of finished jobs for inspection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use railwatch_core::scheduling::JobState;
use railwatch_core::types::JobId;

use crate::error::PipelineError;
use crate::job::{JobEntry, JobStatus};

/// Finished jobs kept for status queries before the oldest are evicted.
pub(crate) const FINISHED_HISTORY: usize = 256;

#[derive(Default)]
struct Inner {
    /// Video locator -> running job.
    running: HashMap<String, JobId>,
    jobs: HashMap<JobId, Arc<JobEntry>>,
    /// Finished job ids, oldest first.
    finished: VecDeque<JobId>,
}

#[derive(Default)]
pub(crate) struct JobRegistry {
    inner: Mutex<Inner>,
}

impl JobRegistry {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new Running job for `video`.
    ///
    /// A job that already reached a terminal state no longer holds the video,
    /// even if its runner has not called [`finish`](Self::finish) yet.
    pub(crate) fn reserve(
        &self,
        video: &str,
        total_frames: usize,
    ) -> Result<Arc<JobEntry>, PipelineError> {
        let mut inner = self.lock();
        if let Some(existing) = inner.running.get(video) {
            if inner.jobs.get(existing).is_some_and(|e| is_live(e)) {
                return Err(PipelineError::JobAlreadyRunning(video.to_string()));
            }
        }

        let id = uuid::Uuid::now_v7();
        let mut status = JobStatus::new(id, video.to_string(), total_frames);
        status.transition(JobState::Running);
        let entry = Arc::new(JobEntry::new(status));

        inner.running.insert(video.to_string(), id);
        inner.jobs.insert(id, Arc::clone(&entry));
        Ok(entry)
    }

    /// Release the video for new jobs and move the job into history.
    pub(crate) fn finish(&self, id: JobId, video: &str) {
        let mut inner = self.lock();
        if inner.running.get(video) == Some(&id) {
            inner.running.remove(video);
        }
        inner.finished.push_back(id);
        while inner.finished.len() > FINISHED_HISTORY {
            if let Some(evicted) = inner.finished.pop_front() {
                inner.jobs.remove(&evicted);
            }
        }
    }

    pub(crate) fn get(&self, id: JobId) -> Option<Arc<JobEntry>> {
        self.lock().jobs.get(&id).cloned()
    }

    pub(crate) fn all(&self) -> Vec<Arc<JobEntry>> {
        self.lock().jobs.values().cloned().collect()
    }

    pub(crate) fn running_count(&self) -> usize {
        let inner = self.lock();
        inner
            .running
            .values()
            .filter(|id| inner.jobs.get(id).is_some_and(|e| is_live(e)))
            .count()
    }
}

fn is_live(entry: &JobEntry) -> bool {
    !entry.status.borrow().state.is_terminal()
}
