//! Orders and their lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::types::{
    CallOutcome, OrderId, OrderSource, OrderStatus, Phone, ProductId, ShippingCompanyId,
};

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub unit_cost: Decimal,
}

impl OrderItem {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    #[must_use]
    pub fn cost(&self) -> Decimal {
        self.unit_cost * Decimal::from(self.quantity)
    }
}

/// A logged confirmation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogEntry {
    pub at: DateTime<Utc>,
    pub outcome: CallOutcome,
    #[serde(default)]
    pub note: String,
    /// Phone of the staff member who called.
    #[serde(default)]
    pub by: Option<Phone>,
}

/// A status change, kept for the order timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
}

/// A customer purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Human-facing sequence number within the store.
    pub number: u64,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_phone: Phone,
    #[serde(default)]
    pub customer_address: String,
    #[serde(default)]
    pub governorate: String,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub shipping_company_id: Option<ShippingCompanyId>,
    #[serde(default)]
    pub insured: bool,
    #[serde(default)]
    pub inspection_paid_by_customer: bool,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default)]
    pub call_log: Vec<CallLogEntry>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub source: OrderSource,
}

impl Order {
    /// Product subtotal minus discount, floored at zero.
    #[must_use]
    pub fn price(&self) -> Decimal {
        let subtotal: Decimal = self.items.iter().map(OrderItem::subtotal).sum();
        (subtotal - self.discount).max(Decimal::ZERO)
    }

    #[must_use]
    pub fn cost(&self) -> Decimal {
        self.items.iter().map(OrderItem::cost).sum()
    }

    /// What the courier collects from the customer.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.price() + self.shipping_fee
    }

    /// Move to `next`, recording the change.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the lifecycle does not
    /// allow the move.
    pub fn transition(&mut self, next: OrderStatus, at: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status_history.push(StatusChange {
            from: self.status,
            to: next,
            at,
        });
        self.status = next;
        Ok(())
    }

    /// When the order last changed status (or was created).
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.status_history
            .last()
            .map_or(self.created_at, |change| change.at)
    }
}

/// Input for creating an order, from the dashboard or the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_address: String,
    #[serde(default)]
    pub governorate: String,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub shipping_company_id: Option<ShippingCompanyId>,
    #[serde(default)]
    pub insured: bool,
    #[serde(default)]
    pub inspection_paid_by_customer: bool,
    #[serde(default)]
    pub notes: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    pub(crate) fn sample_order(phone: &str, status: OrderStatus, price: &str) -> Order {
        Order {
            id: OrderId::generate(),
            number: 1,
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            customer_name: "Mona".to_string(),
            customer_phone: Phone::parse(phone).unwrap(),
            customer_address: "12 Tahrir St".to_string(),
            governorate: "Cairo".to_string(),
            items: vec![OrderItem {
                product_id: None,
                name: "Scarf".to_string(),
                quantity: 1,
                unit_price: d(price),
                unit_cost: d("0"),
            }],
            discount: Decimal::ZERO,
            shipping_fee: d("50"),
            shipping_company_id: None,
            insured: false,
            inspection_paid_by_customer: false,
            status,
            status_history: Vec::new(),
            call_log: Vec::new(),
            notes: String::new(),
            source: OrderSource::Manual,
        }
    }

    #[test]
    fn test_price_cost_total() {
        let mut order = sample_order("01012345678", OrderStatus::PendingCall, "0");
        order.items = vec![
            OrderItem {
                product_id: None,
                name: "Bag".to_string(),
                quantity: 2,
                unit_price: d("400"),
                unit_cost: d("250"),
            },
            OrderItem {
                product_id: None,
                name: "Belt".to_string(),
                quantity: 1,
                unit_price: d("250"),
                unit_cost: d("100"),
            },
        ];
        order.discount = d("50");
        assert_eq!(order.price(), d("1000"));
        assert_eq!(order.cost(), d("600"));
        assert_eq!(order.total(), d("1050"));
    }

    #[test]
    fn test_discount_cannot_make_price_negative() {
        let mut order = sample_order("01012345678", OrderStatus::PendingCall, "100");
        order.discount = d("150");
        assert_eq!(order.price(), Decimal::ZERO);
    }

    #[test]
    fn test_transition_records_history() {
        let mut order = sample_order("01012345678", OrderStatus::PendingCall, "100");
        let at = DateTime::from_timestamp(1_700_000_500, 0).unwrap();
        order.transition(OrderStatus::InReview, at).unwrap();
        assert_eq!(order.status, OrderStatus::InReview);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.last_activity(), at);
    }

    #[test]
    fn test_invalid_transition_leaves_order_untouched() {
        let mut order = sample_order("01012345678", OrderStatus::PendingCall, "100");
        let err = order
            .transition(OrderStatus::Collected, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: OrderStatus::PendingCall,
                to: OrderStatus::Collected
            }
        );
        assert_eq!(order.status, OrderStatus::PendingCall);
        assert!(order.status_history.is_empty());
    }
}
