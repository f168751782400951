//! Authentication error types.

use axum::http::StatusCode;
use thiserror::Error;

use souq_core::{EmailError, PhoneError};

/// Errors that can occur during signup and login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid phone format.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Name left blank.
    #[error("name is required")]
    MissingName,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Phone already registered.
    #[error("an account with this phone already exists")]
    PhoneTaken,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Account banned by a platform admin.
    #[error("this account has been suspended")]
    Banned,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Banned => StatusCode::FORBIDDEN,
            Self::PhoneTaken => StatusCode::CONFLICT,
            Self::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidPhone(_) | Self::InvalidEmail(_) | Self::MissingName | Self::WeakPassword(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}
