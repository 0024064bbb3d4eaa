//! Webhook signature verification.
//!
//! When a shared secret is configured, the bank must send
//! `X-Webhook-Signature: <hex hmac-sha256 of the raw body>`.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use onramp_types::security::{SIGNATURE_HEADER, verify_payload_signature};

use super::handlers::error_body;

/// Webhook bodies are small JSON objects.
const MAX_WEBHOOK_BODY: usize = 64 * 1024;

/// Shared secret for webhook signatures; `None` disables the check.
pub struct WebhookSignature {
    secret: Option<String>,
}

impl WebhookSignature {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(str::to_owned),
        }
    }
}

/// Buffers the body, checks its signature and hands the same bytes on.
pub async fn verify_signature_middleware(
    State(signature): State<Arc<WebhookSignature>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(secret) = signature.secret.as_deref() else {
        return next.run(request).await;
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_WEBHOOK_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable webhook body");
            return error_body(StatusCode::BAD_REQUEST, "Unreadable request body");
        }
    };

    let provided = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(sig) if verify_payload_signature(&bytes, sig, secret) => {
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        Some(_) => {
            tracing::warn!("Rejected webhook with invalid signature");
            error_body(StatusCode::UNAUTHORIZED, "Invalid webhook signature")
        }
        None => {
            tracing::warn!("Rejected unsigned webhook");
            error_body(StatusCode::UNAUTHORIZED, "Missing webhook signature")
        }
    }
}
