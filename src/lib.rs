pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod db;
pub mod jwt;
pub mod rate_limit;

use api::create_api_router;
use axum::Router;
use db::Database;
use jwt::{JwtConfig, REFRESH_GRACE_SECS};
use rate_limit::RateLimitConfig;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing session tokens
    pub jwt_secret: Vec<u8>,
    /// Session token lifetime in seconds
    pub session_secs: u64,
    /// Per-IP rate limiting for auth endpoints
    pub rate_limits: RateLimitConfig,
}

/// Create the application router with the given configuration.
pub fn create_app(config: ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::with_durations(
        &config.jwt_secret,
        config.session_secs,
        REFRESH_GRACE_SECS,
    ));

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    create_api_router(config.db, jwt, Arc::new(config.rate_limits))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
