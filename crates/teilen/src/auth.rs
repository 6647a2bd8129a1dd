//! Shared-secret authentication.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::AppState;
use crate::error::ContentError;

/// Header carrying the shared secret.
pub const AUTH_HEADER: &str = "x-teilen-auth";

/// Decide whether a request may pass.
///
/// Without a configured secret everything passes. Otherwise the provided
/// value must match exactly. The comparison is not constant-time.
pub fn check(configured: Option<&str>, provided: Option<&str>) -> bool {
    match configured {
        None => true,
        Some(secret) => provided == Some(secret),
    }
}

/// Secret sent by the client, `None` if absent or not valid UTF-8.
pub fn provided_secret(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTH_HEADER).and_then(|h| h.to_str().ok())
}

/// Middleware rejecting requests whose `X-Teilen-Auth` header does not match.
///
/// Runs before any route body, so a 401 always wins over path validation.
pub async fn require_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ContentError> {
    if !check(state.password.as_deref(), provided_secret(req.headers())) {
        warn!("Rejected request to {} with a wrong secret", req.uri().path());
        return Err(ContentError::Unauthorized);
    }

    Ok(next.run(req).await)
}
