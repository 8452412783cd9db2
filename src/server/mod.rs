//! HTTP surface: an axum router around [`crate::convert::convert_json`].
//!
//! | Route | Auth | Response |
//! |-------|------|----------|
//! | `GET /status` | no | `{"status":"healthy"}` |
//! | `GET /auth-status` | no | `{"auth_required": bool}` |
//! | `GET /` | no | landing page |
//! | `GET /openapi.yaml` | no | API description, 404 when absent |
//! | `POST /convert` | when configured | EPUB bytes or `{"error": …}` |
//!
//! Anything else is a JSON 404.

mod auth;
mod handlers;

use crate::config::ServiceConfig;
use crate::error::Md2EpubError;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared, read-only state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(config: ServiceConfig) -> Router {
    let state = AppState::new(config);
    let body_limit = state.config.max_body_bytes;

    let protected = Router::new()
        .route("/convert", post(handlers::convert))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route("/status", get(handlers::status))
        .route("/auth-status", get(handlers::auth_status))
        .route("/openapi.yaml", get(handlers::openapi))
        .merge(protected)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind to `config.bind_addr()` and serve until Ctrl+C.
pub async fn serve(config: ServiceConfig) -> Result<(), Md2EpubError> {
    let addr = config.bind_addr();
    let auth = config.auth_required();
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Md2EpubError::io("binding listener", e))?;
    info!("Listening on http://{} (auth {})", addr, if auth { "on" } else { "off" });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Md2EpubError::io("serving HTTP", e))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// JSON error body `{"error": "<message>"}` with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for Md2EpubError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error_response(status, self.public_message())
    }
}
