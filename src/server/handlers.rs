use super::{error_response, AppState};
use crate::convert::convert_json;
use crate::error::Md2EpubError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::path::Path;
use tracing::warn;

const BUILTIN_INDEX: &str = include_str!("../../static/index.html");

pub(super) async fn status() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub(super) async fn auth_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "auth_required": state.config.auth_required() }))
}

/// Landing page: `<static_dir>/index.html`, else the built-in copy.
pub(super) async fn index(State(state): State<AppState>) -> Html<String> {
    match read_static(&state.config.static_dir, "index.html").await {
        Some(page) => Html(page),
        None => Html(BUILTIN_INDEX.to_string()),
    }
}

pub(super) async fn openapi(State(state): State<AppState>) -> Response {
    match read_static(&state.config.static_dir, "openapi.yaml").await {
        Some(doc) => ([(header::CONTENT_TYPE, "application/yaml")], doc).into_response(),
        None => not_found().await,
    }
}

pub(super) async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

/// `POST /convert`: the body is handed over raw so that a missing, empty or
/// non-JSON body yields the same 400 as a body without `markdown`.
pub(super) async fn convert(State(state): State<AppState>, body: Bytes) -> Response {
    match convert_json(&body, &state.config).await {
        Ok(book) => {
            let disposition = format!("attachment; filename=\"{}\"", book.file_name);
            let mut response = book.bytes.into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(book.mime_type));
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-store, must-revalidate"),
            );
            headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
            response
        }
        Err(e) => e.into_response(),
    }
}

async fn read_static(dir: &Path, name: &str) -> Option<String> {
    let path = dir.join(name);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("{}", Md2EpubError::io("reading static file", e));
            None
        }
    }
}
