//! HTTP API
//!
//! Routes:
//! - `GET /` health check
//! - `POST /upload?scope=&fresh=` multipart file upload
//! - `POST /upload_text` pasted text
//! - `POST /query` grounded question answering
//! - `POST /reset` clear one scope

pub mod error;
pub mod routes;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::rag::RagPipeline;

pub use error::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub upload_dir: PathBuf,
}

/// Build the router; `max_body_bytes` bounds every request body
pub fn app_router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::health))
        .route("/upload", post(routes::upload))
        .route("/upload_text", post(routes::upload_text))
        .route("/query", post(routes::query))
        .route("/reset", post(routes::reset))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Load the pipeline and serve until the process is stopped
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    config.ensure_dirs().context("Failed to create upload directory")?;

    let pipeline = RagPipeline::from_config(config)
        .await
        .context("Failed to initialise RAG pipeline")?;

    let state = AppState {
        pipeline: Arc::new(pipeline),
        upload_dir: config.upload_dir(),
    };
    let app = app_router(state, config.server.max_upload_bytes);

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid host/port {}", config.bind_addr()))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("minirag backend listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
