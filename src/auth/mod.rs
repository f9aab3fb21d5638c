//! Bearer-token authentication with role-based access control.
//!
//! Protected routes pull an `Auth` extractor, which verifies the bearer
//! token strictly (expired tokens are rejected; clients recover via the
//! refresh endpoint) and exposes the verified claims to handlers.

mod errors;
mod extractors;
mod state;
mod types;

pub use errors::AuthError;
pub use extractors::{Auth, TeacherOnly, bearer_token};
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
