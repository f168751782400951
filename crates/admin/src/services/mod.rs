//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Phone + password signup and login (Argon2id)

pub mod auth;

pub use auth::AuthError;
