//! Inference adapter: wraps the external object-detection capability
//! behind a stable, deadline-bounded interface.
//!
//! - [`Detector`]: one loaded model; `detect(frame) -> detections`.
//! - [`ModelLoader`]: produces a [`Detector`]; loading is memoized once per
//!   [`InferenceAdapter`].
//! - [`InferenceAdapter`]: the pipeline-facing entry point; adds the
//!   per-call timeout and maps failures onto [`InferenceError`].
//! - [`http`]: loader/detector pair talking to an HTTP inference server.

pub mod adapter;
pub mod config;
pub mod detector;
pub mod error;
pub mod http;

pub use adapter::InferenceAdapter;
pub use config::InferenceConfig;
pub use detector::{Detector, ModelLoader};
pub use error::InferenceError;
pub use http::HttpModelLoader;
