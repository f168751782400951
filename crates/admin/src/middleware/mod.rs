//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added by the binary)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions, in memory)
//!
//! Authentication is enforced per handler through the extractors in
//! [`auth`].

pub mod auth;
pub mod session;

pub use auth::{ActiveStore, RequirePlatformAdmin, RequireUser};
pub use session::create_session_layer;
