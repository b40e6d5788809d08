//! HTTP server setup and routing
//!
//! Sets up the Axum HTTP server with the scan boundary, record management
//! routes and the SSE feedback stream.

use crate::capture::CapturePipeline;
use crate::error::{Error, Result};
use crate::store::ScanStore;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use scantrail_common::events::EventBus;
use sqlx::{Pool, Sqlite};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application context passed to all handlers
///
/// The pipeline sits behind a tokio Mutex: exactly one payload is in
/// flight at a time, which is what makes the check-then-insert link
/// dedup safe.
#[derive(Clone)]
pub struct AppContext {
    pub pipeline: Arc<Mutex<CapturePipeline>>,
    pub store: ScanStore,
    pub events: EventBus,
    pub db_pool: Pool<Sqlite>,
}

/// Build the API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Scan boundary
        .route("/scan", post(super::handlers::scan))
        // Mode control
        .route("/mode", get(super::handlers::get_mode))
        .route("/mode", post(super::handlers::set_mode))
        // Record management
        .route("/records", get(super::handlers::get_records))
        .route("/records/:event_id", delete(super::handlers::delete_record))
        .route("/records/:event_id/name", put(super::handlers::rename_record))
        .route("/records/:event_id/photo", post(super::handlers::attach_photo))
        // Asset projection
        .route("/assets", get(super::handlers::get_assets))
        // Plain-text export
        .route("/export", get(super::handlers::export))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        // Attach application context
        .with_state(ctx)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until shutdown is requested
pub async fn run(ctx: AppContext, port: u16) -> Result<()> {
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}

/// Resolve when Ctrl-C or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
