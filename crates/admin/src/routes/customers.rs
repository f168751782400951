//! Customer profiles.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use souq_core::{CustomerNote, CustomerProfile, DomainError, Permission, Phone};

use crate::error::AppError;
use crate::middleware::ActiveStore;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list))
        .route("/api/customers/{phone}", get(show))
        .route("/api/customers/{phone}/note", put(update_note))
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub blocked: bool,
}

fn parse_phone(raw: &str) -> Result<Phone, DomainError> {
    Ok(Phone::parse(raw)?)
}

async fn profiles(state: &AppState, ctx: &ActiveStore) -> Result<Vec<CustomerProfile>, AppError> {
    ctx.require(Permission::Customers)?;
    let store = &ctx.store;
    state
        .workspace()
        .read_both(store, |global, data| {
            data.customer_profiles(Some(&global.loyalty_data), store)
        })
        .await
        .map_err(AppError::from)
}

/// Every customer who ordered from the store, biggest spenders first.
///
/// # Errors
///
/// Returns 403 without the customers permission.
pub async fn list(
    State(state): State<AppState>,
    ctx: ActiveStore,
) -> Result<Json<Vec<CustomerProfile>>, AppError> {
    Ok(Json(profiles(&state, &ctx).await?))
}

/// # Errors
///
/// Returns 404 if the phone never ordered.
pub async fn show(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Path(phone): Path<String>,
) -> Result<Json<CustomerProfile>, AppError> {
    let phone = parse_phone(&phone)?;
    profiles(&state, &ctx)
        .await?
        .into_iter()
        .find(|p| p.phone == phone)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Customer {phone}")))
}

/// Set notes and the blocked flag on a customer.
///
/// # Errors
///
/// Returns 400 for an invalid phone.
#[instrument(skip_all, fields(store = %ctx.store))]
pub async fn update_note(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Path(phone): Path<String>,
    Json(body): Json<NoteRequest>,
) -> Result<Json<CustomerNote>, AppError> {
    ctx.require(Permission::Customers)?;
    let note = CustomerNote {
        phone: parse_phone(&phone)?,
        notes: body.notes,
        blocked: body.blocked,
    };
    state
        .update_store(&ctx.store, |data| {
            data.set_customer_note(note.clone());
            Ok(())
        })
        .await?;
    Ok(Json(note))
}
