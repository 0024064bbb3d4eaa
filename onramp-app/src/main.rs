//! # On-Ramp Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the ledger adapter
//! - Create the on-ramp service
//! - Start the HTTP server

mod config;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onramp_hex::{
    OnRampService,
    inbound::{HttpServer, ServerSettings},
};
use onramp_repo::build_repo;

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("onramp-service"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,onramp_app=debug,onramp_hex=debug".into());

    // Initialize tracing subscriber, with OpenTelemetry export when enabled
    let otel_provider = if config.otel_enabled {
        let (otel_tracer, otel_provider) = init_tracer()?;
        let telemetry = tracing_opentelemetry::layer().with_tracer(otel_tracer);
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .with(telemetry)
            .init();
        Some(otel_provider)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        None
    };

    tracing::info!("Starting on-ramp server on port {}", config.port);

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;
    tracing::info!(backend = repo.backend(), "Ledger store ready");

    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET not set; bank webhooks are accepted unsigned");
    }
    if config.admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY not set; admin API is disabled");
    }

    let service = OnRampService::new(repo);

    // Create and run the HTTP server
    let server = HttpServer::new(
        service,
        ServerSettings {
            webhook_secret: config.webhook_secret,
            admin_api_key: config.admin_api_key,
            requests_per_minute: config.requests_per_minute,
            trust_forwarded_for: config.trust_proxy,
        },
    );
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
