//! Wallet ledger.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use souq_core::{
    Permission, Posting, Reconciliation, Transaction, TransactionCategory, TransactionId,
    WalletSummary,
};

use crate::error::AppError;
use crate::middleware::ActiveStore;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wallet", get(show))
        .route("/api/wallet/deposits", post(deposit))
        .route("/api/wallet/withdrawals", post(withdraw))
        .route("/api/wallet/expenses", post(add_expense))
        .route("/api/wallet/expenses/{id}", delete(delete_expense))
        .route("/api/wallet/reconcile", post(reconcile))
}

#[derive(Debug, Serialize)]
pub struct WalletView {
    pub summary: WalletSummary,
    /// Newest first.
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
}

/// # Errors
///
/// Returns 403 without the wallet permission.
pub async fn show(
    State(state): State<AppState>,
    ctx: ActiveStore,
) -> Result<Json<WalletView>, AppError> {
    ctx.require(Permission::Wallet)?;
    let view = state
        .read_store(&ctx.store, |data| WalletView {
            summary: data.wallet.summary(),
            transactions: data.wallet.transactions.iter().rev().cloned().collect(),
        })
        .await?;
    Ok(Json(view))
}

async fn record(
    state: &AppState,
    ctx: &ActiveStore,
    posting: Posting,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    ctx.require(Permission::Wallet)?;
    let txn = state
        .update_store(&ctx.store, |data| Ok(data.wallet.record(posting, Utc::now())?))
        .await?;
    info!(
        transaction = %txn.id,
        kind = ?txn.kind,
        category = ?txn.category,
        amount = %txn.amount,
        "wallet entry recorded"
    );
    Ok((StatusCode::CREATED, Json(txn)))
}

/// # Errors
///
/// Returns 400 unless the amount is positive.
#[instrument(skip_all, fields(store = %ctx.store))]
pub async fn deposit(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Json(body): Json<EntryRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let posting = Posting::deposit(TransactionCategory::Manual, body.amount, body.description);
    record(&state, &ctx, posting).await
}

/// # Errors
///
/// Returns 400 unless the amount is positive.
#[instrument(skip_all, fields(store = %ctx.store))]
pub async fn withdraw(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Json(body): Json<EntryRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let posting = Posting::withdrawal(TransactionCategory::Manual, body.amount, body.description);
    record(&state, &ctx, posting).await
}

/// # Errors
///
/// Returns 400 unless the amount is positive.
#[instrument(skip_all, fields(store = %ctx.store))]
pub async fn add_expense(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Json(body): Json<EntryRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let posting = Posting::withdrawal(TransactionCategory::Expense, body.amount, body.description);
    record(&state, &ctx, posting).await
}

/// Cancel an expense. The ledger keeps both entries.
///
/// # Errors
///
/// Returns 404 for unknown entries and 409 if already reversed.
#[instrument(skip_all, fields(store = %ctx.store, transaction = %id))]
pub async fn delete_expense(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Path(id): Path<TransactionId>,
) -> Result<Json<Transaction>, AppError> {
    ctx.require(Permission::Wallet)?;
    let reversal = state
        .update_store(&ctx.store, |data| {
            Ok(data.wallet.reverse_expense(&id, Utc::now())?)
        })
        .await?;
    info!(reversal = %reversal.id, "expense reversed");
    Ok(Json(reversal))
}

/// Compare the stored balance with the ledger and reset it.
///
/// # Errors
///
/// Returns 403 without the wallet permission.
#[instrument(skip_all, fields(store = %ctx.store))]
pub async fn reconcile(
    State(state): State<AppState>,
    ctx: ActiveStore,
) -> Result<Json<Reconciliation>, AppError> {
    ctx.require(Permission::Wallet)?;
    let result = state
        .update_store(&ctx.store, |data| Ok(data.wallet.reconcile()))
        .await?;
    if !result.drift.is_zero() {
        tracing::warn!(drift = %result.drift, "wallet balance drift corrected");
    }
    Ok(Json(result))
}
