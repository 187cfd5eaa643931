//! The browser front end: one page plus a small JSON API.
//!
//! ```text
//! GET    /                                        calculator page
//! GET    /healthz                                 liveness + pdf renderer status
//! POST   /api/documents                           multipart upload (field `file`)
//! GET    /api/documents/{id}/pages/{page}         page image (PNG)
//! POST   /api/documents/{id}/pages/{page}/scale   calibrate a page
//! POST   /api/documents/{id}/pages/{page}/measure measure a page
//! GET    /api/documents/{id}/export.csv           all measured rows as CSV
//! DELETE /api/documents/{id}                      drop a document
//! ```
//!
//! The page images are served at their rendered size and the browser sends
//! shape coordinates in image pixels, so the scale stays valid whatever zoom
//! the page is shown at.

mod error;
mod handlers;
mod state;
mod template;
mod upload;

pub use error::ApiError;
pub use state::{AppState, SharedState};

use crate::config::{CalculatorConfig, ServerConfig};
use crate::engine;
use crate::error::HekwerkError;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes + MULTIPART_OVERHEAD);
    let cors_permissive = state.cors_permissive;

    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::healthz))
        .route("/api/documents", post(handlers::upload))
        .route("/api/documents/{id}", axum::routing::delete(handlers::remove))
        .route("/api/documents/{id}/pages/{page}", get(handlers::page_image))
        .route(
            "/api/documents/{id}/pages/{page}/scale",
            post(handlers::calibrate),
        )
        .route(
            "/api/documents/{id}/pages/{page}/measure",
            post(handlers::measure),
        )
        .route("/api/documents/{id}/export.csv", get(handlers::export_csv))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Probe the renderer, bind the listener and serve until Ctrl-C.
pub async fn serve(config: CalculatorConfig, server: ServerConfig) -> Result<(), HekwerkError> {
    server.validate()?;

    let engine_config = config.engine.clone();
    let renderer = tokio::task::spawn_blocking(move || engine::probe(&engine_config))
        .await
        .map_err(|e| HekwerkError::Internal(format!("Renderer probe panicked: {}", e)))?;
    match &renderer.library {
        Some(source) if renderer.available => info!("PDF rendering available ({:?})", source),
        _ => warn!(
            "PDF rendering unavailable, only image uploads will work: {}",
            renderer.reason.as_deref().unwrap_or("unknown reason")
        ),
    }

    let addr = server.bind_addr();
    let state = AppState::new(config, &server, renderer).shared();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| HekwerkError::Server {
            addr: addr.clone(),
            source,
        })?;
    info!(
        "Listening on http://{} (CORS {})",
        addr,
        if server.cors_permissive { "permissive" } else { "same-origin" }
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| HekwerkError::Server { addr, source })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            warn!("No Ctrl-C handler ({}), running until killed", e);
            std::future::pending::<()>().await;
        }
    }
}
