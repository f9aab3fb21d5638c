//! Authenticated user types.

use crate::db::UserRole;
use crate::jwt::Claims;

/// Authenticated user information extracted from a verified session token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Verified claims from the session token
    pub claims: Claims,
}

impl AuthenticatedUser {
    /// Subject (user UUID) from the claims.
    pub fn uuid(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> UserRole {
        self.claims.role
    }

    pub fn is_teacher(&self) -> bool {
        self.claims.role == UserRole::Teacher
    }
}
