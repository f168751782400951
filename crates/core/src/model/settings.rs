//! Per-store settings: catalog, couriers, staff and loyalty.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::fees::FeeConfig;
use crate::types::{
    CurrencyCode, EmployeeId, EmployeeStatus, Permission, Phone, ProductId, ShippingCompanyId,
};

/// A courier the store ships with, and what it charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingCompany {
    pub id: ShippingCompanyId,
    pub name: String,
    #[serde(default)]
    pub fees: FeeConfig,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

const fn default_true() -> bool {
    true
}

/// A user's membership in someone else's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub phone: Phone,
    pub name: String,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
    #[serde(default)]
    pub status: EmployeeStatus,
    pub invited_at: DateTime<Utc>,
}

impl Employee {
    /// Apply a membership state change.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEmployeeTransition` for moves outside
    /// `invited → active | removed`, `active → removed`.
    pub fn transition(&mut self, next: EmployeeStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidEmployeeTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltySettings {
    pub enabled: bool,
    /// Currency units spent per point earned.
    pub units_per_point: Decimal,
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            units_per_point: Decimal::TEN,
        }
    }
}

impl LoyaltySettings {
    /// Smallest accepted spend per point (one piastre/halala/fils).
    pub const MIN_UNITS_PER_POINT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

    /// Check the settings before they are saved.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` if `units_per_point` is below
    /// [`Self::MIN_UNITS_PER_POINT`].
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.units_per_point < Self::MIN_UNITS_PER_POINT {
            return Err(DomainError::Invalid(format!(
                "units per point must be at least {}",
                Self::MIN_UNITS_PER_POINT
            )));
        }
        Ok(())
    }

    /// Points earned for a collected order of `price`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` if the rate is out of range or the
    /// point count does not fit.
    pub fn points_for(&self, price: Decimal) -> Result<i64, DomainError> {
        if !self.enabled || price <= Decimal::ZERO {
            return Ok(0);
        }
        self.validate()?;
        price
            .checked_div(self.units_per_point)
            .map(|points| points.floor())
            .and_then(|points| i64::try_from(points).ok())
            .ok_or_else(|| DomainError::Invalid(format!("loyalty points overflow for {price}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub shipping_companies: Vec<ShippingCompany>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub loyalty: LoyaltySettings,
}

impl StoreSettings {
    #[must_use]
    pub fn shipping_company(&self, id: &ShippingCompanyId) -> Option<&ShippingCompany> {
        self.shipping_companies.iter().find(|c| &c.id == id)
    }

    /// Fee configuration for an order's courier; empty when unknown.
    #[must_use]
    pub fn fees_for(&self, id: Option<&ShippingCompanyId>) -> FeeConfig {
        id.and_then(|id| self.shipping_company(id))
            .map(|c| c.fees.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    pub fn product_mut(&mut self, id: &ProductId) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| &p.id == id)
    }

    /// The membership of `phone`, unless removed.
    #[must_use]
    pub fn membership(&self, phone: &Phone) -> Option<&Employee> {
        self.employees
            .iter()
            .find(|e| &e.phone == phone && e.status != EmployeeStatus::Removed)
    }

    #[must_use]
    pub fn employee(&self, id: &EmployeeId) -> Option<&Employee> {
        self.employees.iter().find(|e| &e.id == id)
    }

    pub fn employee_mut(&mut self, id: &EmployeeId) -> Option<&mut Employee> {
        self.employees.iter_mut().find(|e| &e.id == id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::order::tests::d;

    #[test]
    fn test_points_floor_and_disabled() {
        let mut loyalty = LoyaltySettings::default();
        assert_eq!(loyalty.points_for(d("999")).unwrap(), 0);
        loyalty.enabled = true;
        assert_eq!(loyalty.points_for(d("999")).unwrap(), 99);
        assert_eq!(loyalty.points_for(d("9.99")).unwrap(), 0);
    }

    #[test]
    fn test_tiny_rate_is_rejected_instead_of_overflowing() {
        let loyalty = LoyaltySettings {
            enabled: true,
            units_per_point: Decimal::new(1, 28),
        };
        assert!(loyalty.validate().is_err());
        assert!(matches!(
            loyalty.points_for(d("1000")),
            Err(DomainError::Invalid(_))
        ));

        let cheapest = LoyaltySettings {
            enabled: true,
            units_per_point: LoyaltySettings::MIN_UNITS_PER_POINT,
        };
        assert!(cheapest.validate().is_ok());
        assert_eq!(cheapest.points_for(d("1000")).unwrap(), 100_000);
    }

    #[test]
    fn test_unknown_courier_has_no_fees() {
        let settings = StoreSettings::default();
        let fees = settings.fees_for(Some(&ShippingCompanyId::new("ship_x")));
        assert_eq!(fees, FeeConfig::default());
    }
}
