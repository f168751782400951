//! Store settings.

use axum::{Json, Router, extract::State, routing::{get, put}};
use serde::Deserialize;
use tracing::{info, instrument};

use souq_core::{
    CurrencyCode, DomainError, FeeConfig, LoyaltySettings, Permission, ShippingCompany,
    ShippingCompanyId, StoreSettings,
};

use crate::error::AppError;
use crate::middleware::ActiveStore;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/settings", get(show).put(update))
        .route("/api/settings/shipping-companies", put(replace_shipping_companies))
}

/// General settings. Fields left out keep their value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettings {
    pub display_name: Option<String>,
    pub currency: Option<CurrencyCode>,
    pub loyalty: Option<LoyaltySettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingCompanyInput {
    /// Omitted for new companies.
    pub id: Option<ShippingCompanyId>,
    pub name: String,
    #[serde(default)]
    pub fees: FeeConfig,
}

/// # Errors
///
/// Returns 403 without the settings permission.
pub async fn show(
    State(state): State<AppState>,
    ctx: ActiveStore,
) -> Result<Json<StoreSettings>, AppError> {
    ctx.require(Permission::Settings)?;
    let settings = state.read_store(&ctx.store, |data| data.settings.clone()).await?;
    Ok(Json(settings))
}

/// # Errors
///
/// Returns 400 for a blank display name or a loyalty rate below
/// [`LoyaltySettings::MIN_UNITS_PER_POINT`].
#[instrument(skip_all, fields(store = %ctx.store))]
pub async fn update(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Json(body): Json<UpdateSettings>,
) -> Result<Json<StoreSettings>, AppError> {
    ctx.require(Permission::Settings)?;
    if body.display_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(DomainError::Invalid("display name cannot be blank".to_string()).into());
    }
    if let Some(loyalty) = &body.loyalty {
        loyalty.validate()?;
    }

    let settings = state
        .update_store(&ctx.store, |data| {
            let settings = &mut data.settings;
            if let Some(name) = body.display_name {
                settings.display_name = name.trim().to_string();
            }
            if let Some(currency) = body.currency {
                settings.currency = currency;
            }
            if let Some(loyalty) = body.loyalty {
                settings.loyalty = loyalty;
            }
            Ok(settings.clone())
        })
        .await?;
    info!("settings updated");
    Ok(Json(settings))
}

/// Replace the shipping company list. Orders keep referring to companies
/// by id, so existing ids should be sent back unchanged.
///
/// # Errors
///
/// Returns 400 if a company has no name or a negative fee setting.
#[instrument(skip_all, fields(store = %ctx.store, count = body.len()))]
pub async fn replace_shipping_companies(
    State(state): State<AppState>,
    ctx: ActiveStore,
    Json(body): Json<Vec<ShippingCompanyInput>>,
) -> Result<Json<Vec<ShippingCompany>>, AppError> {
    ctx.require(Permission::Settings)?;
    let companies = body
        .into_iter()
        .map(|input| {
            let name = input.name.trim();
            if name.is_empty() {
                return Err(DomainError::Invalid("shipping company name is required".to_string()));
            }
            input.fees.validate()?;
            Ok(ShippingCompany {
                id: input.id.unwrap_or_else(ShippingCompanyId::generate),
                name: name.to_string(),
                fees: input.fees,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let saved = state
        .update_store(&ctx.store, |data| {
            data.settings.shipping_companies = companies;
            Ok(data.settings.shipping_companies.clone())
        })
        .await?;
    Ok(Json(saved))
}
