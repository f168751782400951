//! Platform administration of user accounts.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use tracing::{info, instrument};

use souq_core::{DomainError, Phone};

use crate::error::AppError;
use crate::middleware::RequirePlatformAdmin;
use crate::models::UserView;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list))
        .route("/api/admin/users/{phone}/ban", post(ban))
        .route("/api/admin/users/{phone}/unban", post(unban))
}

/// Every registered user.
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    RequirePlatformAdmin(_admin): RequirePlatformAdmin,
) -> Json<Vec<UserView>> {
    let users: Vec<UserView> = state
        .read_global(|global| global.users.iter().map(UserView::from).collect())
        .await;
    Json(users)
}

async fn set_banned(
    state: &AppState,
    admin: &Phone,
    raw: &str,
    banned: bool,
) -> Result<UserView, AppError> {
    let phone = Phone::parse(raw).map_err(DomainError::from)?;
    if &phone == admin {
        return Err(AppError::BadRequest("You cannot ban yourself".to_string()));
    }
    let user = state
        .update_global(|global| {
            let user = global
                .user_mut(&phone)
                .ok_or_else(|| DomainError::UserNotFound(phone.to_string()))?;
            user.is_banned = banned;
            Ok::<_, AppError>(UserView::from(&*user))
        })
        .await?;
    info!(phone = %phone, banned, "user ban flag changed");
    Ok(user)
}

/// Suspend an account. The user is locked out on their next request.
///
/// # Errors
///
/// Returns 404 for unknown phones.
#[instrument(skip_all, fields(phone = %phone))]
pub async fn ban(
    State(state): State<AppState>,
    RequirePlatformAdmin(admin): RequirePlatformAdmin,
    Path(phone): Path<String>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(set_banned(&state, &admin.phone, &phone, true).await?))
}

/// # Errors
///
/// Returns 404 for unknown phones.
#[instrument(skip_all, fields(phone = %phone))]
pub async fn unban(
    State(state): State<AppState>,
    RequirePlatformAdmin(admin): RequirePlatformAdmin,
    Path(phone): Path<String>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(set_banned(&state, &admin.phone, &phone, false).await?))
}
