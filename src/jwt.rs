//! Session token generation and validation.
//!
//! Tokens are stateless HS256 JWTs carrying the subject's id, username and
//! role. Verification is a single code path parameterized by an expiry
//! policy: strict for protected routes, grace-tolerant for refresh.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// Default session token lifetime: 24 hours.
pub const SESSION_TOKEN_DURATION_SECS: u64 = 24 * 60 * 60;

/// Post-expiry window during which a token may still be refreshed: 30 minutes.
pub const REFRESH_GRACE_SECS: u64 = 30 * 60;

/// Claims encoded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,
    /// Username
    pub username: String,
    /// User role
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Result of issuing a session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

/// How token expiry is enforced during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Reject any token whose expiry has passed.
    Strict,
    /// Accept tokens expired by no more than the grace window.
    Grace,
}

/// Configuration for token operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_secs: u64,
    grace_secs: u64,
}

impl JwtConfig {
    /// Create a configuration with the default lifetime and grace window.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_durations(secret, SESSION_TOKEN_DURATION_SECS, REFRESH_GRACE_SECS)
    }

    /// Create a configuration with explicit lifetime and grace window.
    pub fn with_durations(secret: &[u8], session_secs: u64, grace_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            session_secs,
            grace_secs,
        }
    }

    /// Session token lifetime in seconds.
    pub fn session_secs(&self) -> u64 {
        self.session_secs
    }

    /// Issue a session token for a user.
    pub fn issue(
        &self,
        user_uuid: &str,
        username: &str,
        role: UserRole,
    ) -> Result<IssuedToken, JwtError> {
        let now = unix_now()?;
        let exp = now + self.session_secs;

        let claims = Claims {
            sub: user_uuid.to_string(),
            username: username.to_string(),
            role,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: exp,
        })
    }

    /// Validate a token's signature and enforce expiry per the given policy.
    ///
    /// The signature check always runs first; a signature failure is fatal
    /// under either policy. Expiry is enforced here, in one place, rather
    /// than by the JWT library, so strict and grace verification cannot
    /// drift apart.
    pub fn verify(&self, token: &str, policy: ExpiryPolicy) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(JwtError::Decoding)?;
        let claims = token_data.claims;

        let now = unix_now()?;
        if now >= claims.exp {
            match policy {
                ExpiryPolicy::Strict => return Err(JwtError::Expired),
                ExpiryPolicy::Grace => {
                    if now - claims.exp > self.grace_secs {
                        return Err(JwtError::GraceExceeded);
                    }
                }
            }
        }

        Ok(claims)
    }

    /// Exchange a valid-or-recently-expired token for a fresh one.
    ///
    /// The subject, username and role carry over; issued-at and expiry are
    /// renewed. Tokens past the grace window are rejected.
    pub fn refresh(&self, token: &str) -> Result<IssuedToken, JwtError> {
        let claims = self.verify(token, ExpiryPolicy::Grace)?;
        self.issue(&claims.sub, &claims.username, claims.role)
    }
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token (malformed or bad signature)
    Decoding(jsonwebtoken::errors::Error),
    /// Token expired (strict policy)
    Expired,
    /// Token expired beyond the refresh grace window
    GraceExceeded,
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::GraceExceeded => write!(f, "Token expired beyond the refresh window"),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
