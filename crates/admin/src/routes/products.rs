//! Catalog management.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};

use souq_core::{DomainError, Permission, Product, ProductId};

use crate::error::AppError;
use crate::middleware::ActiveStore;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route("/api/products/{id}", put(update))
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub stock: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub stock: Option<u32>,
    pub active: Option<bool>,
}

fn check_amount(value: Decimal) -> Result<Decimal, DomainError> {
    if value.is_sign_negative() {
        Err(DomainError::InvalidAmount(value))
    } else {
        Ok(value)
    }
}

/// # Errors
///
/// Returns 403 without the products permission.
pub async fn list(
    State(state): State<AppState>,
    ctx: ActiveStore,
) -> Result<Json<Vec<Product>>, AppError> {
    ctx.require(Permission::Products)?;
    let products = state
        .read_store(&ctx.store, |data| data.settings.products.clone())
        .await?;
    Ok(Json(products))
}

/// # Errors
///
/// Returns 400 for a blank name or negative amounts.
#[instrument(skip_all, fields(store = %ctx.store))]
pub async fn create(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Json(body): Json<CreateProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    ctx.require(Permission::Products)?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(DomainError::Invalid("product name is required".to_string()).into());
    }
    let product = Product {
        id: ProductId::generate(),
        name: name.to_string(),
        price: check_amount(body.price)?,
        cost: check_amount(body.cost)?,
        stock: body.stock,
        active: true,
    };

    state
        .update_store(&ctx.store, |data| {
            data.settings.products.push(product.clone());
            Ok(())
        })
        .await?;
    info!(product = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// # Errors
///
/// Returns 404 for unknown products.
#[instrument(skip_all, fields(store = %ctx.store, product = %id))]
pub async fn update(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateProduct>,
) -> Result<Json<Product>, AppError> {
    ctx.require(Permission::Products)?;
    let price = body.price.map(check_amount).transpose()?;
    let cost = body.cost.map(check_amount).transpose()?;
    if body.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(DomainError::Invalid("product name is required".to_string()).into());
    }

    let product = state
        .update_store(&ctx.store, |data| {
            let product = data
                .settings
                .product_mut(&id)
                .ok_or_else(|| DomainError::ProductNotFound(id.clone()))?;
            if let Some(name) = body.name {
                product.name = name.trim().to_string();
            }
            if let Some(price) = price {
                product.price = price;
            }
            if let Some(cost) = cost {
                product.cost = cost;
            }
            if let Some(stock) = body.stock {
                product.stock = stock;
            }
            if let Some(active) = body.active {
                product.active = active;
            }
            Ok(product.clone())
        })
        .await?;
    Ok(Json(product))
}
