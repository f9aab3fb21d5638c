//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Authentication failures surfaced by the extractors.
#[derive(Debug)]
pub enum AuthError {
    /// No Authorization header, or not a bearer header.
    MissingToken,
    /// Malformed token or bad signature.
    InvalidToken,
    /// Valid signature, expired beyond what the route accepts.
    TokenExpired,
    /// Valid token, insufficient role.
    InsufficientRole,
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired => {
                "Unauthorized"
            }
            AuthError::InsufficientRole => "Forbidden",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authentication required",
            AuthError::InvalidToken => "Invalid token",
            AuthError::TokenExpired => "Token has expired",
            AuthError::InsufficientRole => "Insufficient permissions",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.message(),
                "type": self.error_type(),
            }
        });
        (self.status_code(), Json(body)).into_response()
    }
}
