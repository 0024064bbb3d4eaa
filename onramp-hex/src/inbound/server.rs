//! HTTP Server configuration and startup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use onramp_types::LedgerStore;

use super::auth::{AdminAuth, admin_auth_middleware};
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use super::signature::{WebhookSignature, verify_signature_middleware};
use crate::OnRampService;

/// Runtime knobs for the HTTP adapter.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Shared secret for `X-Webhook-Signature`; unsigned webhooks are accepted when unset.
    pub webhook_secret: Option<String>,
    /// Bearer key for the `/api` routes; they answer 401 when unset.
    pub admin_api_key: Option<String>,
    pub requests_per_minute: u32,
    /// Take the client address from the last `X-Forwarded-For` hop; only
    /// set when a reverse proxy that appends it fronts the server.
    pub trust_forwarded_for: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            admin_api_key: None,
            requests_per_minute: 600,
            trust_forwarded_for: false,
        }
    }
}

/// HTTP Server for the on-ramp API.
pub struct HttpServer<R: LedgerStore> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
    admin: Arc<AdminAuth>,
    signature: Arc<WebhookSignature>,
}

impl<R: LedgerStore> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: OnRampService<R>, settings: ServerSettings) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::new(
                settings.requests_per_minute,
                Duration::from_secs(60),
                settings.trust_forwarded_for,
            )),
            admin: Arc::new(AdminAuth::new(settings.admin_api_key.as_deref())),
            signature: Arc::new(WebhookSignature::new(settings.webhook_secret.as_deref())),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let webhook = Router::new()
            .route("/hdfcWebHook", post(handlers::bank_webhook::<R>))
            .route_layer(middleware::from_fn_with_state(
                self.signature.clone(),
                verify_signature_middleware,
            ));

        let admin = Router::new()
            .route("/api/onramp", post(handlers::initiate_onramp::<R>))
            .route("/api/onramp/{token}", get(handlers::get_onramp::<R>))
            .route("/api/onramp/{token}/fail", post(handlers::fail_onramp::<R>))
            .route("/api/balances/{user_id}", get(handlers::get_balance::<R>))
            .route_layer(middleware::from_fn_with_state(
                self.admin.clone(),
                admin_auth_middleware,
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .merge(webhook)
            .merge(admin)
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
