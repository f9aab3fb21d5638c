//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down brute
//! force attempts against login and registration.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for authentication endpoints.
pub struct RateLimitConfig {
    /// Per-IP limiter for login attempts (1 per second, burst of 5)
    pub login: IpLimiter,
    /// Per-IP limiter for registration (3 per minute)
    pub register: IpLimiter,
}

impl RateLimitConfig {
    /// Create rate limiters with production quotas.
    pub fn new() -> Self {
        Self {
            login: RateLimiter::keyed(
                Quota::per_second(NonZeroU32::new(1).unwrap())
                    .allow_burst(NonZeroU32::new(5).unwrap()),
            ),
            register: RateLimiter::keyed(Quota::per_minute(NonZeroU32::new(3).unwrap())),
        }
    }

    /// Create effectively unlimited limiters for test setups.
    pub fn relaxed() -> Self {
        let quota = Quota::per_second(NonZeroU32::new(10_000).unwrap());
        Self {
            login: RateLimiter::keyed(quota),
            register: RateLimiter::keyed(quota),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client key for rate limiting. Falls back to a fixed key when the
/// connection info is unavailable (e.g. in-process test routers).
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "local".to_string())
}

fn too_many_requests() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        "Too many requests. Please try again later.",
    )
        .into_response()
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    match config.login.check_key(&key) {
        Ok(_) => next.run(request).await,
        Err(_) => too_many_requests(),
    }
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    match config.register.check_key(&key) {
        Ok(_) => next.run(request).await,
        Err(_) => too_many_requests(),
    }
}
