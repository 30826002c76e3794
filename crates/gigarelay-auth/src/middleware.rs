//! Axum integration: the `require_auth` middleware and error responses.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;
use crate::gate::AuthGate;

// =============================================================================
// Middleware
// =============================================================================

/// Rejects requests that do not pass the [`AuthGate`].
///
/// Install with `axum::middleware::from_fn_with_state(gate, require_auth)`.
/// A header value that is not valid visible ASCII is treated as missing.
pub async fn require_auth(
    State(gate): State<AuthGate>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match gate.verify(authorization) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            if e.is_server_error() {
                tracing::error!(error = %e, path = %req.uri().path(), "Authentication is not configured");
            } else {
                tracing::debug!(error = %e, path = %req.uri().path(), "Request rejected");
            }
            e.into_response()
        }
    }
}

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl AuthError {
    /// HTTP status for this rejection.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.is_server_error() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::UNAUTHORIZED
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({ "detail": self.to_string() });

        let mut headers = HeaderMap::new();
        if let Some(challenge) = self.challenge() {
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(challenge),
            );
        }

        (status, headers, Json(body)).into_response()
    }
}
