//! Token refresh endpoint.
//!
//! Publicly routed (no auth extractor), but the presented token's signature
//! is verified all the same; the only relaxation is a bounded grace window
//! on expiry. Clients outside the window must log in again.

use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use crate::auth::bearer_token;
use crate::jwt::{JwtConfig, JwtError};

#[derive(Clone)]
pub struct SessionState {
    pub jwt: Arc<JwtConfig>,
}

pub fn router(state: SessionState) -> Router {
    Router::new()
        .route("/refresh", post(refresh))
        .with_state(state)
}

#[derive(Serialize)]
struct RefreshResponse {
    token: String,
}

async fn refresh(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let issued = state.jwt.refresh(token).map_err(|e| match e {
        JwtError::GraceExceeded => {
            debug!("Refresh rejected: token beyond grace window");
            ApiError::unauthorized("Token expired beyond the refresh window")
        }
        _ => {
            debug!("Refresh rejected: invalid token");
            ApiError::unauthorized("Invalid token")
        }
    })?;

    Ok(Json(RefreshResponse {
        token: issued.token,
    }))
}
