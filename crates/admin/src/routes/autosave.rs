//! Save status and the manual save trigger.

use axum::{Json, Router, extract::State, routing::{get, post}};
use serde::Serialize;

use crate::autosave::{LastSave, SaveReport, SaveStatus};
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/autosave", get(status))
        .route("/api/autosave/save", post(save_now))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveView {
    pub status: SaveStatus,
    pub last_save: Option<LastSave>,
}

pub async fn status(State(state): State<AppState>, _user: RequireUser) -> Json<AutosaveView> {
    let autosave = state.autosave();
    Json(AutosaveView {
        status: autosave.status(),
        last_save: autosave.last_save(),
    })
}

/// Save now instead of waiting for the quiet period.
///
/// # Errors
///
/// Returns 500 if the autosave task has stopped. A failed save is
/// reported in the body, not as an error status.
pub async fn save_now(
    State(state): State<AppState>,
    _user: RequireUser,
) -> Result<Json<SaveReport>, AppError> {
    Ok(Json(state.autosave().save_now().await?))
}
