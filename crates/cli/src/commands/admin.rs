//! Platform admin management.
//!
//! Platform admins can see and act on every store and suspend accounts.
//! The flag can only be set from here, never through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! souq admin promote 01012345678
//! souq admin demote 01012345678
//! ```
//!
//! # Environment Variables
//!
//! The same backend variables as the server (`SOUQ_BACKEND`,
//! `SOUQ_DATABASE_URL`, `SOUQ_SCRIPT_URL`, `SOUQ_SCRIPT_API_KEY`).

use thiserror::Error;

use souq_admin::backend::{Backend, BackendError};
use souq_admin::config::{BackendConfig, ConfigError};
use souq_core::{Phone, PhoneError};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    #[error("No user with phone {0}")]
    UserNotFound(Phone),

    #[error("The memory backend does not outlive this command; set SOUQ_BACKEND")]
    MemoryBackend,
}

/// Set or clear the platform admin flag of a user.
///
/// # Errors
///
/// Returns an error if the phone is invalid, the user does not exist or
/// the backend cannot be read or written.
pub async fn set_platform_admin(phone: &str, admin: bool) -> Result<(), AdminError> {
    dotenvy::dotenv().ok();

    let phone = Phone::parse(phone)?;
    let config = BackendConfig::from_env()?;
    if matches!(config, BackendConfig::Memory) {
        return Err(AdminError::MemoryBackend);
    }

    tracing::warn!("A running server overwrites the users document on its next save; stop it first");
    tracing::info!(backend = config.name(), "Connecting to backend...");
    let backend = Backend::connect(&config).await?;
    let mut global = backend.get_global_data().await?;

    let user = global
        .user_mut(&phone)
        .ok_or_else(|| AdminError::UserNotFound(phone.clone()))?;
    if user.is_admin == admin {
        tracing::info!(phone = %phone, admin, "Nothing to change");
        return Ok(());
    }
    user.is_admin = admin;
    backend.save_global_data(&global).await?;

    tracing::info!(phone = %phone, admin, "Platform admin flag updated");
    Ok(())
}
