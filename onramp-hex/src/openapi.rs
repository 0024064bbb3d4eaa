//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use onramp_types::domain::{OnRampStatus, OnRampToken, UserId};
use onramp_types::dto::{
    BalanceResponse, InitiateOnRampRequest, OnRampResponse, WebhookAck, WebhookPayload,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme},
};

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Payment confirmation from HDFC Bank.
///
/// Acknowledged with `Success` whether the deposit was credited now, earlier,
/// or not at all because the token is unknown.
#[utoipa::path(
    post,
    path = "/hdfcWebHook",
    tag = "webhook",
    request_body = WebhookPayload,
    security((), ("webhook_signature" = [])),
    responses(
        (status = 200, description = "Notification acknowledged", body = WebhookAck),
        (status = 400, description = "Malformed payload or details differ from the recorded deposit"),
        (status = 401, description = "Missing or invalid signature"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Ledger unavailable; the bank should retry")
    )
)]
async fn hdfc_webhook() {}

/// Initiate a pending deposit
#[utoipa::path(
    post,
    path = "/api/onramp",
    tag = "onramp",
    request_body = InitiateOnRampRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Deposit recorded as pending", body = OnRampResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Token already exists")
    )
)]
async fn initiate_onramp() {}

/// Get an on-ramp transaction
#[utoipa::path(
    get,
    path = "/api/onramp/{token}",
    tag = "onramp",
    security(("bearer_auth" = [])),
    params(
        ("token" = String, Path, description = "On-ramp token")
    ),
    responses(
        (status = 200, description = "On-ramp transaction", body = OnRampResponse),
        (status = 404, description = "Unknown token"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn get_onramp() {}

/// Mark a pending deposit as failed
#[utoipa::path(
    post,
    path = "/api/onramp/{token}/fail",
    tag = "onramp",
    security(("bearer_auth" = [])),
    params(
        ("token" = String, Path, description = "On-ramp token")
    ),
    responses(
        (status = 200, description = "Deposit marked failed", body = OnRampResponse),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Deposit already settled"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn fail_onramp() {}

/// Get a user's balance
#[utoipa::path(
    get,
    path = "/api/balances/{user_id}",
    tag = "balances",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = String, Path, description = "User identifier")
    ),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 404, description = "No balance for this user"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn get_balance() {}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "On-Ramp Webhook API",
        version = "0.1.0",
        description = "Receives bank deposit confirmations and credits user balances exactly once."
    ),
    paths(
        health,
        hdfc_webhook,
        initiate_onramp,
        get_onramp,
        fail_onramp,
        get_balance,
    ),
    components(
        schemas(
            WebhookPayload,
            WebhookAck,
            InitiateOnRampRequest,
            OnRampResponse,
            BalanceResponse,
            OnRampStatus,
            OnRampToken,
            UserId,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "webhook", description = "Bank payment notifications"),
        (name = "onramp", description = "On-ramp transaction administration"),
        (name = "balances", description = "User balances"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for the admin bearer key and webhook signature.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
            components.add_security_scheme(
                "webhook_signature",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    onramp_types::security::SIGNATURE_HEADER,
                ))),
            );
        }
    }
}
