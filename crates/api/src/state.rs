use std::sync::Arc;

use railwatch_core::sampler::FrameSampler;
use railwatch_core::storage::LocalVideoStorage;
use railwatch_pipeline::ProcessingScheduler;
use railwatch_store::AlertStore;
use railwatch_sync::SyncConfig;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Alert and report records (in-memory or PostgreSQL).
    pub store: Arc<dyn AlertStore>,
    /// Starts, tracks and cancels video processing jobs.
    pub scheduler: ProcessingScheduler,
    /// Where uploaded videos are written.
    pub storage: LocalVideoStorage,
    /// Probes uploads before a job is started.
    pub sampler: FrameSampler,
    /// WebSocket connection manager (dashboard clients).
    pub ws_manager: Arc<WsManager>,
    /// Per-dashboard subscription settings.
    pub sync_config: SyncConfig,
    pub config: Arc<ServerConfig>,
}
