//! Admin authentication for the `/api` routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use onramp_types::security::{hash_api_key, verify_api_key};

use super::handlers::error_body;

/// Hash of the configured admin key; `None` locks the admin routes.
pub struct AdminAuth {
    key_hash: Option<String>,
}

impl AdminAuth {
    pub fn new(admin_api_key: Option<&str>) -> Self {
        Self {
            key_hash: admin_api_key
                .filter(|k| !k.is_empty())
                .map(hash_api_key),
        }
    }
}

/// Extracts the API key from the Authorization header.
/// Expected format: "Bearer <api_key>" or just "<api_key>"
fn extract_api_key(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    Some(header.strip_prefix("Bearer ").unwrap_or(header))
}

/// Rejects requests whose bearer key does not hash to the admin key.
pub async fn admin_auth_middleware(
    State(auth): State<Arc<AdminAuth>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = auth.key_hash.as_deref() else {
        return unauthorized_response("Admin API is disabled");
    };

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let api_key = match extract_api_key(auth_header) {
        Some(key) if !key.is_empty() => key,
        _ => return unauthorized_response("Missing or invalid Authorization header"),
    };

    if !verify_api_key(api_key, expected) {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request with bad key");
        return unauthorized_response("Invalid API key");
    }

    next.run(request).await
}

fn unauthorized_response(message: &str) -> Response {
    error_body(StatusCode::UNAUTHORIZED, message)
}
