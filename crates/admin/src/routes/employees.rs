//! Store staff and invitations.

use std::collections::BTreeSet;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use souq_core::{Employee, EmployeeId, Permission, StoreId};

use crate::error::AppError;
use crate::middleware::{ActiveStore, RequireUser};
use crate::models::session_keys;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/employees", get(list).post(invite))
        .route("/api/employees/{id}", put(update_permissions).delete(remove))
        .route("/api/invitations/{store_id}/accept", post(accept))
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub phone: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionsRequest {
    pub permissions: BTreeSet<Permission>,
}

/// Staff of the active store. Changing staff stays with the owner.
///
/// # Errors
///
/// Returns 403 without the employees permission.
pub async fn list(
    State(state): State<AppState>,
    ctx: ActiveStore,
) -> Result<Json<Vec<Employee>>, AppError> {
    ctx.require(Permission::Employees)?;
    let employees = state
        .read_store(&ctx.store, |data| data.settings.employees.clone())
        .await?;
    Ok(Json(employees))
}

/// Invite a user by phone. The invitee does not need an account yet.
///
/// # Errors
///
/// Returns 409 if the phone is already a member.
#[instrument(skip_all, fields(store = %ctx.store))]
pub async fn invite(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Json(body): Json<InviteRequest>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    ctx.require_owner()?;
    let employee = state
        .update_store(&ctx.store, |data| {
            Ok(data
                .invite_employee(&body.phone, body.name, body.permissions, Utc::now())?
                .clone())
        })
        .await?;
    info!(employee = %employee.id, "employee invited");
    Ok((StatusCode::CREATED, Json(employee)))
}

/// # Errors
///
/// Returns 404 for unknown or removed employees.
#[instrument(skip_all, fields(store = %ctx.store, employee = %id))]
pub async fn update_permissions(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Path(id): Path<EmployeeId>,
    Json(body): Json<PermissionsRequest>,
) -> Result<Json<Employee>, AppError> {
    ctx.require_owner()?;
    let employee = state
        .update_store(&ctx.store, |data| {
            Ok(data.set_employee_permissions(&id, body.permissions)?.clone())
        })
        .await?;
    Ok(Json(employee))
}

/// # Errors
///
/// Returns 409 if the employee was already removed.
#[instrument(skip_all, fields(store = %ctx.store, employee = %id))]
pub async fn remove(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Path(id): Path<EmployeeId>,
) -> Result<Json<Employee>, AppError> {
    ctx.require_owner()?;
    let employee = state
        .update_store(&ctx.store, |data| Ok(data.remove_employee(&id)?.clone()))
        .await?;
    info!("employee removed");
    Ok(Json(employee))
}

/// Accept an invitation and switch to that store.
///
/// # Errors
///
/// Returns 404 without a pending invitation for the caller.
#[instrument(skip_all, fields(user = %user.phone, store = %store_id))]
pub async fn accept(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(store_id): Path<StoreId>,
) -> Result<Json<Employee>, AppError> {
    let exists = state.read_global(|global| global.store(&store_id).is_some()).await;
    if !exists {
        return Err(AppError::NotFound(format!("Store {store_id}")));
    }
    let employee = state
        .update_store(&store_id, |data| Ok(data.accept_invitation(&user.phone)?.clone()))
        .await?;
    session
        .insert(session_keys::LAST_ACTIVE_STORE_ID, &store_id)
        .await?;
    info!("invitation accepted");
    Ok(Json(employee))
}
