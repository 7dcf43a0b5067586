//! Dashboard HTTP service
//!
//! Every request reloads the configured dataset; there is no shared mutable state.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;

pub mod error;
pub mod handlers;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

pub fn router(config: ServerConfig) -> Router {
    let static_dir = config.static_dir.clone();
    let body_limit = config.max_upload_bytes;
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/statistics", get(handlers::statistics))
        .route("/api/race-distribution", get(handlers::race_distribution))
        .route("/api/education-breakdown", get(handlers::education))
        .route("/api/country-analysis", get(handlers::countries))
        .route("/api/age-distribution", get(handlers::ages))
        .route("/api/upload", post(handlers::upload))
        .route("/api/filter", post(handlers::filter))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `config.bind` and serves until Ctrl-C
pub async fn serve(config: ServerConfig) -> io::Result<()> {
    let addr = config.bind;
    if !config.dataset_path.exists() {
        warn!(
            path = %config.dataset_path.display(),
            "default dataset not found; statistics endpoints will return 404"
        );
    }
    if !config.static_dir.is_dir() {
        warn!(dir = %config.static_dir.display(), "static directory not found");
    }

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "census dashboard listening");
    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
