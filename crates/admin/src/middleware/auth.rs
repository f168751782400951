//! Authentication extractors.
//!
//! Every extractor re-reads the user from the workspace on each request,
//! so a ban or a revoked membership takes effect immediately.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use souq_core::{Access, Permission, Phone, StoreId, User, access};

use crate::error::{AppError, set_sentry_user};
use crate::models::session_keys;
use crate::state::AppState;

fn session(parts: &Parts) -> Result<&Session, AppError> {
    parts
        .extensions
        .get::<Session>()
        .ok_or_else(|| AppError::Internal("session layer missing".to_string()))
}

async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(phone) = session(parts)?
        .get::<Phone>(session_keys::LOGGED_IN_USER_PHONE)
        .await?
    else {
        return Ok(None);
    };
    Ok(state.read_global(|global| global.user(&phone).cloned()).await)
}

/// Extractor that requires a logged-in, non-banned user.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireUser(user): RequireUser) -> Json<UserView> {
///     Json(UserView::from(&user))
/// }
/// ```
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, state)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;
        if user.is_banned {
            return Err(AppError::Forbidden("Account suspended".to_string()));
        }
        set_sentry_user(user.phone.as_str());
        Ok(Self(user))
    }
}

/// Extractor that requires a platform admin.
pub struct RequirePlatformAdmin(pub User);

impl FromRequestParts<AppState> for RequirePlatformAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden(
                "Only platform admins can access this resource".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

/// The session's active store and the caller's access to it.
pub struct ActiveStore {
    pub user: User,
    pub store: StoreId,
    pub access: Access,
}

impl ActiveStore {
    /// Fail unless the caller holds `permission`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the permission is missing.
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.access.allows(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Missing permission: {permission}")))
        }
    }

    /// Fail unless the caller owns the store (or is a platform admin).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for employees.
    pub fn require_owner(&self) -> Result<(), AppError> {
        if self.access.is_owner() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Only the store owner can do this".to_string()))
        }
    }
}

impl FromRequestParts<AppState> for ActiveStore {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        let store = session(parts)?
            .get::<StoreId>(session_keys::LAST_ACTIVE_STORE_ID)
            .await?
            .ok_or_else(|| AppError::BadRequest("No active store selected".to_string()))?;

        let resolved = state
            .workspace()
            .read_both(&store, |global, data| {
                global
                    .store(&store)
                    .and_then(|_| access::resolve(&user, &store, &data.settings))
            })
            .await?;
        let access = resolved
            .ok_or_else(|| AppError::Forbidden("No access to this store".to_string()))?;

        Ok(Self {
            user,
            store,
            access,
        })
    }
}
