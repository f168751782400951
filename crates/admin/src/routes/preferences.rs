//! UI preferences kept in the session.

use axum::{Json, Router, routing::{get, post}};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{Theme, session_keys};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/preferences", get(show))
        .route("/api/preferences/theme", post(set_theme))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Theme,
}

/// Current preferences, with defaults for anything unset.
///
/// # Errors
///
/// Returns 500 if the session store fails.
pub async fn show(session: Session) -> Result<Json<Preferences>, AppError> {
    let theme = session
        .get::<Theme>(session_keys::THEME)
        .await?
        .unwrap_or_default();
    Ok(Json(Preferences { theme }))
}

/// Change the theme. Works with or without a login.
///
/// # Errors
///
/// Returns 500 if the session store fails.
pub async fn set_theme(
    session: Session,
    Json(body): Json<Preferences>,
) -> Result<Json<Preferences>, AppError> {
    session.insert(session_keys::THEME, body.theme).await?;
    Ok(Json(body))
}
