mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod skills;
mod state;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::ClientPool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::worker::{WorkerPool, WORKER_COUNT};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume skill extractor v{}", env!("CARGO_PKG_VERSION"));

    // Model clients: one per configured credential slot, fixed for the process lifetime
    let pool = ClientPool::from_credentials(
        &config.credentials,
        &config.llm_api_url,
        Duration::from_secs(config.llm_timeout_secs),
    );
    let labels: Vec<&str> = pool
        .available_clients()
        .iter()
        .map(|c| c.label.as_str())
        .collect();
    info!(
        "Model client pool ready: {} of {} configured slots [{}] (model: {})",
        pool.len(),
        config.configured_slots(),
        labels.join(", "),
        llm_client::MODEL
    );

    let workers = WorkerPool::new(WORKER_COUNT);
    info!("Worker pool size: {}", workers.size());

    let state = AppState {
        pool: Arc::new(pool),
        workers: workers.clone(),
        config: Arc::new(config.clone()),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(workers))
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C. Closes the worker pool so no new uploads start while in-flight ones drain.
async fn shutdown_signal(workers: WorkerPool) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    workers.close();
}
