//! Event type names for processing-job notifications.
//!
//! Published on the event bus by the pipeline and forwarded verbatim to
//! dashboard WebSocket clients as the `type` field.

/// A job was accepted and started processing frames.
pub const EVENT_JOB_STARTED: &str = "job.started";

/// Progress update (fraction of frames processed, current cursor).
pub const EVENT_JOB_PROGRESS: &str = "job.progress";

/// A fall was detected and an alert was written to the store.
pub const EVENT_ALERT_EMITTED: &str = "alert.emitted";

/// The frame sequence was exhausted without cancellation.
pub const EVENT_JOB_COMPLETED: &str = "job.completed";

/// The job stopped at a frame boundary after a cancel request.
pub const EVENT_JOB_CANCELLED: &str = "job.cancelled";

/// The job aborted after repeated inference failures.
pub const EVENT_JOB_FAILED: &str = "job.failed";
