//! Client SDK: session persistence and the authenticated request pipeline.
//!
//! Frontends talk to the backend exclusively through [`ApiClient`], which
//! attaches the stored session token to every request, refreshes it ahead of
//! expiry when possible, and transparently replays a request once after a
//! 401 that a refresh can cure.

mod error;
mod pipeline;
mod session;
mod token;

pub use error::{ClientError, ErrorKind};
pub use pipeline::{ApiClient, ApiClientBuilder};
pub use session::{FileSessionStore, MemorySessionStore, SessionRecord, SessionStore, UserSnapshot};
pub use token::{GRACE_WINDOW_SECS, PRE_EXPIRY_WINDOW_SECS, TokenState, classify_token, decode_expiry};
