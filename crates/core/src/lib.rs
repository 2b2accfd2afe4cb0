//! Domain core for the railwatch fall-detection pipeline.
//!
//! Holds the data model shared by every other crate (videos, frames,
//! detections, alerts, reports), the error taxonomy, and the pure or
//! leaf-level building blocks of the pipeline: the fall classifier, the
//! frame sampler with its ffmpeg decoder, local video storage and the job
//! state machine.

pub mod detection;
pub mod error;
pub mod ffmpeg;
pub mod job_events;
pub mod records;
pub mod sampler;
pub mod scheduling;
pub mod storage;
pub mod types;
pub mod video;
