//! Signup, login and logout.

use axum::{Json, Router, extract::State, http::StatusCode, routing::{get, post}};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use souq_core::Phone;

use crate::error::{AppError, clear_sentry_user};
use crate::middleware::RequireUser;
use crate::models::{UserView, session_keys};
use crate::services::auth::{self, AuthError, SignupRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

/// Create an account and log it in.
///
/// # Errors
///
/// Returns 400 for invalid fields and 409 if the phone is registered.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = auth::new_account(&body, Utc::now())?;
    let view = UserView::from(&user);
    let phone = user.phone.clone();
    state
        .update_global(|global| auth::register(global, user))
        .await?;

    session.cycle_id().await?;
    session.insert(session_keys::LOGGED_IN_USER_PHONE, &phone).await?;
    info!(phone = %phone, "user signed up");
    Ok((StatusCode::CREATED, Json(view)))
}

/// Log in with phone and password.
///
/// # Errors
///
/// Returns 401 for wrong credentials and 403 for suspended accounts.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<UserView>, AppError> {
    let phone = Phone::parse(&body.phone).map_err(|_| AuthError::InvalidCredentials)?;
    let user = state.read_global(|global| global.user(&phone).cloned()).await;
    auth::verify_login(user.as_ref(), &body.password)?;
    let user = user.ok_or(AuthError::InvalidCredentials)?;

    session.cycle_id().await?;
    session.insert(session_keys::LOGGED_IN_USER_PHONE, &user.phone).await?;
    // Resume the store used last if the user still has one.
    if let Some(store) = user.stores.first() {
        let remembered: Option<souq_core::StoreId> =
            session.get(session_keys::LAST_ACTIVE_STORE_ID).await?;
        if remembered.is_none() {
            session.insert(session_keys::LAST_ACTIVE_STORE_ID, &store.id).await?;
        }
    }
    info!(phone = %user.phone, "user logged in");
    Ok(Json(UserView::from(&user)))
}

/// Log out. The theme survives; login and active store do not.
///
/// # Errors
///
/// Returns 500 if the session store fails.
pub async fn logout(session: Session) -> Result<StatusCode, AppError> {
    session
        .remove::<Phone>(session_keys::LOGGED_IN_USER_PHONE)
        .await?;
    session
        .remove::<souq_core::StoreId>(session_keys::LAST_ACTIVE_STORE_ID)
        .await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user.
pub async fn me(RequireUser(user): RequireUser) -> Json<UserView> {
    Json(UserView::from(&user))
}
