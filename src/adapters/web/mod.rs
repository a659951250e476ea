//! Dashboard: a single page plus a small JSON API over the pipeline.
//!
//! Collection runs in a background task; the page polls `/api/status`.

mod error;
mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::FixedOffset;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::domain::DomainError;
use crate::usecases::PipelineService;

pub use error::ApiError;

/// Values applied when a start request leaves a field out.
#[derive(Debug, Clone)]
pub struct RunDefaults {
    pub group: String,
    pub max_posts: usize,
    pub utc_offset: FixedOffset,
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineService>,
    pub defaults: RunDefaults,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::status))
        .route("/api/start_parsing", post(handlers::start_parsing))
        .route("/api/analysis_report", get(handlers::analysis_report))
        .route("/api/visualizations", get(handlers::visualizations))
        .route("/api/image/{filename}", get(handlers::image))
        .route("/api/data_files", get(handlers::data_files))
        .route("/api/download/{filename}", get(handlers::download))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve the dashboard until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DomainError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DomainError::Configuration(format!("bind {}: {}", addr, e)))?;
    let local = listener
        .local_addr()
        .map_err(|e| DomainError::Configuration(e.to_string()))?;
    info!(addr = %local, "dashboard listening");
    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| DomainError::Ui(format!("dashboard server: {}", e)))
}

/// Resolves on Ctrl+C, or on SIGTERM where available.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
