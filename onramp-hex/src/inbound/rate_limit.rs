//! Rate limiting middleware using Governor.
//!
//! Token bucket per client address. The peer socket address is used unless
//! the server sits behind a trusted proxy, in which case the hop that proxy
//! appended to `X-Forwarded-For` identifies the client.

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;
use std::{net::SocketAddr, num::NonZeroU32, time::Duration};

/// Buckets tracked before idle ones are evicted.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<String>,
    period: Duration,
    trust_forwarded_for: bool,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(600, Duration::from_secs(60), false)
    }
}

impl RateLimiterState {
    /// Creates a new rate limiter state.
    ///
    /// `requests` is the burst allowed per `period`; zero is treated as one.
    pub fn new(requests: u32, period: Duration, trust_forwarded_for: bool) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let replenish = period / burst.get();
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::keyed(quota),
            period,
            trust_forwarded_for,
        }
    }

    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, key: &str) -> bool {
        if self.limiter.len() > MAX_TRACKED_CLIENTS {
            self.limiter.retain_recent();
            self.limiter.shrink_to_fit();
        }

        self.limiter.check_key(&key.to_string()).is_ok()
    }

    /// Number of client buckets currently held.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if self.trust_forwarded_for {
            // The trusted proxy appends the address it saw as the last hop
            let forwarded = headers
                .get("X-Forwarded-For")
                .and_then(|h| h.to_str().ok())
                .and_then(|v| v.rsplit(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty());
            if let Some(ip) = forwarded {
                return ip.to_string();
            }
        }

        peer.map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<std::sync::Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Skip rate limiting for health endpoint
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = limiter.client_key(request.headers(), peer);

    if !limiter.check(&key) {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded. Please try again later.",
                "code": 429,
                "retry_after_seconds": limiter.period.as_secs()
            })),
        )
            .into_response();
    }

    next.run(request).await
}
