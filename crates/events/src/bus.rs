//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the fan-out hub for [`PipelineEvent`]s. Share it via
//! `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use railwatch_core::types::JobId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// A discrete notification about a processing job or an emitted alert.
///
/// Constructed via [`PipelineEvent::new`] and enriched with
/// [`with_job`](PipelineEvent::with_job),
/// [`with_video`](PipelineEvent::with_video), and
/// [`with_payload`](PipelineEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Dot-separated event name, e.g. `"job.completed"`.
    pub event_type: String,

    /// Job the event belongs to, if any.
    pub job_id: Option<JobId>,

    /// Locator of the video being processed, if any.
    pub video: Option<String>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    /// Create an event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            job_id: None,
            video: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_video(mut self, locator: impl Into<String>) -> Self {
        self.video = Some(locator.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use railwatch_events::bus::{EventBus, PipelineEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PipelineEvent::new("job.started"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if there are none.
    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
