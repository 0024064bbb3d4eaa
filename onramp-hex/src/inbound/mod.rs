//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
mod handlers;
mod rate_limit;
mod server;
mod signature;

pub use handlers::AppState;
pub use server::{HttpServer, ServerSettings};
