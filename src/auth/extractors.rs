//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use super::errors::AuthError;
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::jwt::{ExpiryPolicy, JwtError};

/// Pull the bearer token out of an Authorization header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Shared verification logic: bearer token, strict expiry.
fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthError>
where
    S: HasAuthBackend,
{
    let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;

    let claims = state
        .jwt()
        .verify(token, ExpiryPolicy::Strict)
        .map_err(|e| match e {
            JwtError::Expired | JwtError::GraceExceeded => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

    Ok(AuthenticatedUser { claims })
}

/// Extractor for routes that require a valid, unexpired session token.
/// Rejects with a structured 401 before any handler logic runs.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state).map(Auth)
    }
}

/// Extractor for teacher-only routes. Valid student tokens get a 403.
pub struct TeacherOnly(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for TeacherOnly
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate_request(parts, state)?;
        if !user.is_teacher() {
            return Err(AuthError::InsufficientRole);
        }
        Ok(TeacherOnly(user))
    }
}
