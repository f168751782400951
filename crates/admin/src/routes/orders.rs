//! Orders, confirmation calls and the fee reports built on them.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use souq_core::{
    CallOutcome, CollectionsReport, DomainError, FeeBreakdown, FeeInput, NewOrder, Order,
    OrderFilter, OrderId, OrderSource, OrderStatus, Permission, QueueEntry, ShippingCompanyId,
    TransitionOutcome, fees,
};

use crate::error::AppError;
use crate::middleware::ActiveStore;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list).post(create))
        .route("/api/orders/{id}", get(show))
        .route("/api/orders/{id}/status", post(change_status))
        .route("/api/orders/{id}/calls", post(log_call))
        .route("/api/confirmation-queue", get(confirmation_queue))
        .route("/api/reports/collections", get(collections))
        .route("/api/fees/preview", post(preview_fees))
}

/// An order with its fee breakdown.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub fees: FeeBreakdown,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct CallRequest {
    pub outcome: CallOutcome,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePreviewRequest {
    #[serde(flatten)]
    pub input: FeeInput,
    pub shipping_company_id: Option<ShippingCompanyId>,
}

/// Orders of the active store, newest first.
///
/// # Errors
///
/// Returns 403 without the orders permission.
pub async fn list(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, AppError> {
    ctx.require(Permission::Orders)?;
    let orders = state
        .read_store(&ctx.store, |data| {
            data.list_orders(&filter).into_iter().cloned().collect::<Vec<_>>()
        })
        .await?;
    Ok(Json(orders))
}

/// # Errors
///
/// Returns 404 for unknown orders.
pub async fn show(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>, AppError> {
    ctx.require(Permission::Orders)?;
    let detail = state
        .read_store(&ctx.store, |data| {
            data.order(&id).map(|order| OrderDetail {
                fees: data.fees_for(order),
                order: order.clone(),
            })
        })
        .await?
        .ok_or_else(|| DomainError::OrderNotFound(id.to_string()))?;
    Ok(Json(detail))
}

/// Enter an order by hand.
///
/// # Errors
///
/// Returns 400 for invalid input and 409 when stock runs out.
#[instrument(skip_all, fields(store = %ctx.store))]
pub async fn create(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Json(body): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    ctx.require(Permission::Orders)?;
    let order = state
        .update_store(&ctx.store, |data| {
            Ok(data
                .create_order(body, OrderSource::Manual, Utc::now())?
                .clone())
        })
        .await?;
    info!(order = %order.id, number = order.number, "order created");
    Ok((StatusCode::CREATED, Json(order)))
}

/// Move an order along its lifecycle. Collected orders award loyalty
/// points to the customer.
///
/// # Errors
///
/// Returns 409 for transitions the lifecycle does not allow.
#[instrument(skip_all, fields(store = %ctx.store, order = %id, to = %body.status))]
pub async fn change_status(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<TransitionOutcome>, AppError> {
    ctx.require(Permission::Orders)?;
    let store = ctx.store.clone();
    let outcome = state
        .update_both(&ctx.store, |global, data| {
            let outcome = data.transition_order(&id, body.status, Utc::now())?;
            if outcome.loyalty_points > 0 {
                global
                    .loyalty_data
                    .award(&store, &outcome.order.customer_phone, outcome.loyalty_points);
            }
            Ok(outcome)
        })
        .await?;
    info!(
        postings = outcome.postings.len(),
        points = outcome.loyalty_points,
        "order status changed"
    );
    Ok(Json(outcome))
}

/// Log a confirmation call.
///
/// # Errors
///
/// Returns 400 if the order is not waiting for confirmation.
#[instrument(skip_all, fields(store = %ctx.store, order = %id))]
pub async fn log_call(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Path(id): Path<OrderId>,
    Json(body): Json<CallRequest>,
) -> Result<Json<Order>, AppError> {
    ctx.require(Permission::ConfirmationQueue)?;
    let by = Some(ctx.user.phone.clone());
    let order = state
        .update_store(&ctx.store, |data| {
            Ok(data
                .record_call(&id, body.outcome, body.note, by, Utc::now())?
                .clone())
        })
        .await?;
    Ok(Json(order))
}

/// # Errors
///
/// Returns 403 without the confirmation queue permission.
pub async fn confirmation_queue(
    State(state): State<AppState>,
    ctx: ActiveStore,
) -> Result<Json<Vec<QueueEntry>>, AppError> {
    ctx.require(Permission::ConfirmationQueue)?;
    let queue = state
        .read_store(&ctx.store, souq_core::StoreData::confirmation_queue)
        .await?;
    Ok(Json(queue))
}

/// Fee and profit breakdown over the filtered orders.
///
/// # Errors
///
/// Returns 403 without the wallet permission.
pub async fn collections(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<CollectionsReport>, AppError> {
    ctx.require(Permission::Wallet)?;
    let report = state
        .read_store(&ctx.store, |data| data.collections_report(&filter))
        .await?;
    Ok(Json(report))
}

/// Fees for an order that has not been created yet.
///
/// # Errors
///
/// Returns 404 for an unknown shipping company.
pub async fn preview_fees(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Json(body): Json<FeePreviewRequest>,
) -> Result<Json<FeeBreakdown>, AppError> {
    ctx.require(Permission::Orders)?;
    let config = state
        .read_store(&ctx.store, |data| match &body.shipping_company_id {
            Some(id) => data
                .settings
                .shipping_company(id)
                .map(|c| c.fees.clone())
                .ok_or_else(|| DomainError::ShippingCompanyNotFound(id.clone())),
            None => Ok(souq_core::FeeConfig::default()),
        })
        .await??;
    Ok(Json(fees::calculate(&body.input, &config)))
}
