//! Unified error handling for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use souq_core::DomainError;

use crate::autosave::AutosaveError;
use crate::backend::BackendError;
use crate::services::auth::AuthError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// A business rule rejected the request.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Loading or saving documents failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Signup or login failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The autosave task is gone.
    #[error("Autosave error: {0}")]
    Autosave(#[from] AutosaveError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::UserNotFound(_)
        | DomainError::StoreNotFound(_)
        | DomainError::OrderNotFound(_)
        | DomainError::ProductNotFound(_)
        | DomainError::ShippingCompanyNotFound(_)
        | DomainError::EmployeeNotFound(_)
        | DomainError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidTransition { .. }
        | DomainError::InvalidEmployeeTransition { .. }
        | DomainError::AlreadyMember(_)
        | DomainError::AlreadyReversed(_)
        | DomainError::OutOfStock { .. } => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(e) => domain_status(e),
            Self::Backend(BackendError::Conflict { .. }) => StatusCode::CONFLICT,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(e) => e.status(),
            Self::Autosave(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Backend(BackendError::Conflict { .. }) => {
                "Store was modified elsewhere, reload and try again".to_string()
            }
            Self::Backend(_) => "Storage service error".to_string(),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Set the Sentry user context from the logged-in phone.
pub fn set_sentry_user(phone: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(phone.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
