//! Shared-secret authentication for the conversion route.
//!
//! The token is accepted from `Authorization: Bearer <token>` or from
//! `X-API-Key: <token>`. With no secret configured the middleware is a
//! pass-through.

use super::{error_response, AppState};
use crate::error::Md2EpubError;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

const API_KEY_HEADER: &str = "x-api-key";
const BEARER_SCHEME: &str = "Bearer";

pub(super) async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.auth_token.as_deref() else {
        return next.run(request).await;
    };

    let authorized = presented_tokens(request.headers())
        .any(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()));

    if authorized {
        next.run(request).await
    } else {
        debug!("Rejected {} {}: missing or wrong token", request.method(), request.uri().path());
        error_response(
            StatusCode::UNAUTHORIZED,
            Md2EpubError::AuthRequired.public_message(),
        )
    }
}

/// Every candidate token in the request, bearer first.
fn presented_tokens(headers: &HeaderMap) -> impl Iterator<Item = &str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_credentials);
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);
    bearer.into_iter().chain(api_key)
}

/// Credentials of a `Bearer` authorization value. The scheme is matched
/// case-insensitively.
fn bearer_credentials(value: &str) -> Option<&str> {
    let (scheme, credentials) = value.trim_start().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case(BEARER_SCHEME)
        .then(|| credentials.trim())
}

/// Compare without short-circuiting on the first differing byte.
///
/// Length still leaks; the secret's length is not considered sensitive.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
