//! Public storefront, addressed by store slug.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use souq_core::{
    CartLine, CheckoutDetails, CurrencyCode, Order, ProductId, StoreData, StoreId,
};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/store/{slug}", get(catalog))
        .route(
            "/store/{slug}/cart",
            get(show_cart).post(update_cart).delete(clear_cart),
        )
        .route("/store/{slug}/checkout", post(checkout))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub in_stock: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub name: String,
    pub currency: CurrencyCode,
    pub products: Vec<CatalogProduct>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
}

/// Add to or set a cart line. `set` replaces the quantity; zero removes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub set: bool,
}

async fn resolve(state: &AppState, slug: &str) -> Result<StoreId, AppError> {
    state
        .read_global(|global| global.store_by_slug(slug).map(|s| s.id.clone()))
        .await
        .ok_or_else(|| AppError::NotFound(format!("Store {slug}")))
}

fn cart_view(data: &StoreData) -> CartView {
    let subtotal = data
        .cart
        .iter()
        .filter_map(|line| {
            data.settings
                .product(&line.product_id)
                .map(|p| p.price * Decimal::from(line.quantity))
        })
        .sum();
    CartView {
        lines: data.cart.clone(),
        subtotal,
    }
}

/// Active products of a store.
///
/// # Errors
///
/// Returns 404 for unknown slugs.
pub async fn catalog(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Catalog>, AppError> {
    let store = resolve(&state, &slug).await?;
    let catalog = state
        .read_store(&store, |data| Catalog {
            name: data.settings.display_name.clone(),
            currency: data.settings.currency,
            products: data
                .settings
                .products
                .iter()
                .filter(|p| p.active)
                .map(|p| CatalogProduct {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    price: p.price,
                    in_stock: p.stock > 0,
                })
                .collect(),
        })
        .await?;
    Ok(Json(catalog))
}

/// # Errors
///
/// Returns 404 for unknown slugs.
pub async fn show_cart(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CartView>, AppError> {
    let store = resolve(&state, &slug).await?;
    Ok(Json(state.read_store(&store, cart_view).await?))
}

/// # Errors
///
/// Returns 404 for unknown products and 409 when stock is short.
#[instrument(skip_all, fields(slug = %slug))]
pub async fn update_cart(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<CartRequest>,
) -> Result<Json<CartView>, AppError> {
    let store = resolve(&state, &slug).await?;
    let cart = state
        .update_store(&store, |data| {
            if body.set {
                data.set_cart_quantity(&body.product_id, body.quantity)?;
            } else {
                data.add_to_cart(&body.product_id, body.quantity)?;
            }
            Ok(cart_view(data))
        })
        .await?;
    Ok(Json(cart))
}

/// # Errors
///
/// Returns 404 for unknown slugs.
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    let store = resolve(&state, &slug).await?;
    state
        .update_store(&store, |data| {
            data.cart.clear();
            Ok(())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Turn the cart into a `pending_call` order.
///
/// # Errors
///
/// Returns 400 for an empty cart or bad customer details and 409 when
/// stock ran out since the items were added.
#[instrument(skip_all, fields(slug = %slug))]
pub async fn checkout(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<CheckoutDetails>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let store = resolve(&state, &slug).await?;
    let order = state
        .update_store(&store, |data| Ok(data.checkout(body, Utc::now())?))
        .await?;
    info!(store = %store, order = %order.id, number = order.number, "storefront order placed");
    Ok((StatusCode::CREATED, Json(order)))
}
