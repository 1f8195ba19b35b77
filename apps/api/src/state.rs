use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ClientPool;
use crate::worker::WorkerPool;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once at startup; nothing in it is mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ClientPool>,
    /// Runs the model call for each upload off the request handler.
    pub workers: WorkerPool,
    pub config: Arc<Config>,
}
