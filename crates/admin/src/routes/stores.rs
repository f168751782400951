//! Store creation and switching.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};

use souq_core::{
    Access, CurrencyCode, EmployeeStatus, Store, StoreData, StoreId, StoreSettings, access,
};

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::session_keys;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stores", get(list).post(create))
        .route("/api/stores/{id}/activate", post(activate))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub currency: CurrencyCode,
}

/// A store the user can switch to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreEntry {
    #[serde(flatten)]
    pub store: Store,
    pub access: Access,
    pub active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreList {
    pub stores: Vec<StoreEntry>,
    /// Stores where the user has a pending invitation.
    pub invitations: Vec<Store>,
}

/// Stores the user owns or works in. Store documents that are not
/// already loaded are read from the backend and dropped again.
///
/// # Errors
///
/// Returns an error if a member store cannot be loaded.
#[instrument(skip_all, fields(user = %user.phone))]
pub async fn list(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Result<Json<StoreList>, AppError> {
    let active: Option<StoreId> = session.get(session_keys::LAST_ACTIVE_STORE_ID).await?;
    let all: Vec<Store> = state
        .read_global(|global| {
            global
                .users
                .iter()
                .flat_map(|u| u.stores.iter().cloned())
                .collect()
        })
        .await;

    let mut stores = Vec::new();
    let mut invitations = Vec::new();
    for store in all {
        // Only stores owned by the user or listing them as staff are relevant.
        // Peeking keeps stores nobody is working in out of the workspace.
        let (access, invited) = state
            .workspace()
            .peek_store(&store.id, |data| {
                let invited = data
                    .settings
                    .membership(&user.phone)
                    .is_some_and(|e| e.status == EmployeeStatus::Invited);
                let access = if user.owns(&store.id) || data.settings.membership(&user.phone).is_some() {
                    access::resolve(&user, &store.id, &data.settings)
                } else {
                    None
                };
                (access, invited)
            })
            .await?;
        if let Some(access) = access {
            stores.push(StoreEntry {
                active: active.as_ref() == Some(&store.id),
                store,
                access,
            });
        } else if invited {
            invitations.push(store);
        }
    }
    Ok(Json(StoreList {
        stores,
        invitations,
    }))
}

/// Open a new store and make it the active one.
///
/// # Errors
///
/// Returns 400 if the name is blank.
#[instrument(skip_all, fields(user = %user.phone))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Json(body): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<Store>), AppError> {
    let store = state
        .update_global(|global| {
            global.create_store(
                &user.phone,
                &body.name,
                &body.specialization,
                body.currency,
                Utc::now(),
            )
        })
        .await?;

    let settings = StoreSettings {
        display_name: store.name.clone(),
        currency: store.currency,
        ..StoreSettings::default()
    };
    state
        .workspace()
        .insert_store(store.id.clone(), StoreData::new(settings))
        .await;
    state.autosave().notify(Some(store.id.clone()));

    session
        .insert(session_keys::LAST_ACTIVE_STORE_ID, &store.id)
        .await?;
    info!(store = %store.id, url = %store.url, "store created");
    Ok((StatusCode::CREATED, Json(store)))
}

/// Make `id` the store the dashboard acts on.
///
/// # Errors
///
/// Returns 404 for unknown stores and 403 without access.
#[instrument(skip_all, fields(user = %user.phone, store = %id))]
pub async fn activate(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Access>, AppError> {
    let exists = state.read_global(|global| global.store(&id).is_some()).await;
    if !exists {
        return Err(AppError::NotFound(format!("Store {id}")));
    }
    let access = state
        .read_store(&id, |data| access::resolve(&user, &id, &data.settings))
        .await?
        .ok_or_else(|| AppError::Forbidden("No access to this store".to_string()))?;

    session.insert(session_keys::LAST_ACTIVE_STORE_ID, &id).await?;
    Ok(Json(access))
}
