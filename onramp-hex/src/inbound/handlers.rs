//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;

use onramp_types::{
    AppError, BalanceResponse, InitiateOnRampRequest, LedgerStore, OnRampResponse, WebhookAck,
    WebhookPayload,
};

use crate::OnRampService;
use crate::openapi::ApiDoc;

/// Application state shared across handlers.
pub struct AppState<R: LedgerStore> {
    pub service: OnRampService<R>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal(msg) => {
                // The caller only learns that it may retry; operators get the cause.
                tracing::error!(error = %msg, "Request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        error_body(status, &message)
    }
}

/// JSON error body shared by handlers and middleware.
pub(crate) fn error_body(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({
        "error": message,
        "code": status.as_u16()
    });

    (status, Json(body)).into_response()
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// OpenAPI document for the service.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ─────────────────────────────────────────────────────────────────────────────
// Bank webhook
// ─────────────────────────────────────────────────────────────────────────────

/// Payment confirmation from the bank.
///
/// The body is taken as raw bytes so the signature layer and this handler
/// see the same payload; every parse or type error is a 400.
#[tracing::instrument(skip(state, body), fields(token = tracing::field::Empty))]
pub async fn bank_webhook<R: LedgerStore>(
    State(state): State<Arc<AppState<R>>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed payload: {}", e)))?;

    tracing::Span::current().record("token", tracing::field::display(&payload.token));

    let outcome = state.service.handle_notification(payload).await?;
    tracing::debug!(outcome = outcome.label(), "Webhook acknowledged");

    Ok((StatusCode::OK, Json(WebhookAck::success())))
}

// ─────────────────────────────────────────────────────────────────────────────
// On-ramp administration
// ─────────────────────────────────────────────────────────────────────────────

/// Initiate a pending deposit.
#[tracing::instrument(skip(state, req), fields(user_id = %req.user_id, amount = req.amount))]
pub async fn initiate_onramp<R: LedgerStore>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<InitiateOnRampRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tx = state.service.initiate_onramp(req).await?;
    Ok((StatusCode::CREATED, Json(OnRampResponse::from(tx))))
}

/// Get an on-ramp transaction by token.
#[tracing::instrument(skip(state))]
pub async fn get_onramp<R: LedgerStore>(
    State(state): State<Arc<AppState<R>>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tx = state.service.get_onramp(&token).await?;
    Ok(Json(OnRampResponse::from(tx)))
}

/// Mark a pending deposit as failed.
#[tracing::instrument(skip(state))]
pub async fn fail_onramp<R: LedgerStore>(
    State(state): State<Arc<AppState<R>>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tx = state.service.fail_onramp(&token).await?;
    tracing::info!(%token, "On-ramp marked failed");
    Ok(Json(OnRampResponse::from(tx)))
}

/// Get a user's balance.
#[tracing::instrument(skip(state))]
pub async fn get_balance<R: LedgerStore>(
    State(state): State<Arc<AppState<R>>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state.service.get_balance(&user_id).await?;
    Ok(Json(BalanceResponse::from(balance)))
}
