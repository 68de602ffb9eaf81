//! HTTP service
//!
//! ```text
//! client ──> TraceLayer ──> request_context ──> TimeoutLayer ──> handler
//!                               │                                   │
//!                        request id, client key        validate → rate limit → quota
//!                                                      → cache → spawn_blocking(analyze)
//! ```

pub mod error;
pub mod handlers;
pub mod routes;
pub mod schema;

pub use error::{ApiError, ValidationError};
pub use routes::{create_router, AppState, RequestMeta};
pub use schema::{BatchReverseRequest, BatchReverseResponse, HealthResponse, ReverseRequest};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::config::ServiceConfig;

/// Binds the configured address and serves until Ctrl+C or SIGTERM
pub async fn serve(config: ServiceConfig) -> Result<()> {
    let bind_addr = config.bind_addr().context("Invalid listen address")?;
    let state = Arc::new(AppState::new(config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!(address = %bind_addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
