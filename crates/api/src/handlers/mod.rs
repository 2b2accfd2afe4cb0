//! Request handlers.
//!
//! Each submodule provides the async handler functions for one resource.
//! Handlers delegate to the store, storage or scheduler held in
//! [`AppState`](crate::state::AppState) and map errors via
//! [`AppError`](crate::error::AppError).

pub mod alerts;
pub mod jobs;
pub mod reports;
pub mod videos;
