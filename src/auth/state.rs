//! Authentication state trait and macro.

use crate::jwt::JwtConfig;

/// Trait for state types that expose the JWT configuration to the
/// authentication extractors. Verification is stateless; no database
/// access is involved.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
}

/// Macro to implement `HasAuthBackend` for state structs carrying a
/// `jwt: Arc<JwtConfig>` field.
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
        }
    };
}
