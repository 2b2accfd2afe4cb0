//! Processing Scheduler: runs one cooperative, cancellable analysis job per
//! video, frame by frame, and turns fall judgments into stored alerts.
//!
//! - [`ProcessingScheduler`]: starts, lists and cancels jobs.
//! - [`JobHandle`]: a started job; observe its status/progress or wait for
//!   it to finish.
//! - [`PipelineConfig`]: sampling interval, threshold and failure limit.

pub mod config;
pub mod error;
pub mod job;
mod registry;
mod runner;
pub mod scheduler;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use job::{JobHandle, JobStatus};
pub use scheduler::ProcessingScheduler;
