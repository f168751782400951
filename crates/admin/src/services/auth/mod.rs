//! Password authentication.
//!
//! Accounts are identified by normalized phone. Hashing and verification
//! are CPU-heavy, so they run outside the workspace lock: signup first
//! builds the account with [`new_account`], then [`register`] inserts it
//! under the lock; login copies the stored hash out and checks it with
//! [`verify_login`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use souq_core::{Email, GlobalData, Phone, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Signup form.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

/// Validate a signup form and hash its password.
///
/// # Errors
///
/// Returns `AuthError` if a field is invalid or hashing fails.
#[instrument(skip_all)]
pub fn new_account(request: &SignupRequest, at: DateTime<Utc>) -> Result<User, AuthError> {
    let phone = Phone::parse(&request.phone)?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingName);
    }
    let email = match request.email.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(Email::parse(raw)?),
        _ => None,
    };
    validate_password(&request.password)?;
    let password_hash = hash_password(&request.password)?;

    Ok(User {
        name: name.to_owned(),
        phone,
        email,
        password_hash,
        is_admin: false,
        is_banned: false,
        stores: Vec::new(),
        created_at: at,
    })
}

/// Add a new account to the global blob.
///
/// # Errors
///
/// Returns `AuthError::PhoneTaken` if the phone is already registered.
pub fn register(global: &mut GlobalData, user: User) -> Result<(), AuthError> {
    if global.user(&user.phone).is_some() {
        return Err(AuthError::PhoneTaken);
    }
    global.users.push(user);
    Ok(())
}

/// Check a login attempt against a copy of the stored user.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` for an unknown phone or wrong
/// password, and `AuthError::Banned` for a suspended account.
#[instrument(skip_all)]
pub fn verify_login(user: Option<&User>, password: &str) -> Result<(), AuthError> {
    let user = user.ok_or(AuthError::InvalidCredentials)?;
    verify_password(password, &user.password_hash)?;
    if user.is_banned {
        return Err(AuthError::Banned);
    }
    Ok(())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
