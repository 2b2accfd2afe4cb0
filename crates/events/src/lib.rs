//! Railwatch in-process notification bus.
//!
//! - [`EventBus`]: publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`PipelineEvent`]: the envelope for job lifecycle and alert
//!   notifications (names in `railwatch_core::job_events`).

pub mod bus;

pub use bus::{EventBus, PipelineEvent};
