//! Customer profiles derived from order history.
//!
//! There is no customer table: a customer is everyone who ordered with the
//! same normalized phone. Profiles are recomputed from the orders on each
//! request, then enriched with the staff notes stored alongside them and
//! the customer's loyalty balance.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::Order;
use crate::types::{CustomerSegment, OrderStatus, Phone};

/// Returned orders needed before a customer can be at risk.
pub const AT_RISK_MIN_RETURNS: u32 = 2;
/// Share of completed orders returned that marks a customer at risk (%).
pub const AT_RISK_RETURN_RATE_PERCENT: u32 = 30;
/// Successful orders that make a customer VIP.
pub const VIP_MIN_SUCCESSFUL: u32 = 5;
/// Total spent that makes a customer VIP.
pub const VIP_MIN_SPENT: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

/// Staff notes on a customer, persisted with the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerNote {
    pub phone: Phone,
    #[serde(default)]
    pub notes: String,
    /// Blocked customers are flagged on new orders.
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub phone: Phone,
    /// Name on the most recent order.
    pub name: String,
    /// Address on the most recent order.
    pub address: String,
    pub total_orders: u32,
    pub successful_orders: u32,
    pub returned_orders: u32,
    pub canceled_orders: u32,
    /// Sum of the price of successful orders.
    pub total_spent: Decimal,
    pub first_order_at: DateTime<Utc>,
    pub last_order_at: DateTime<Utc>,
    pub loyalty_points: i64,
    pub blocked: bool,
    pub notes: String,
    pub segment: CustomerSegment,
}

/// Classify a customer from their counters.
///
/// Checked in order: at risk, VIP, new, regular.
#[must_use]
pub fn classify(total: u32, successful: u32, returned: u32, spent: Decimal) -> CustomerSegment {
    let completed = successful + returned;
    if returned >= AT_RISK_MIN_RETURNS
        && completed > 0
        && returned * 100 >= completed * AT_RISK_RETURN_RATE_PERCENT
    {
        CustomerSegment::AtRisk
    } else if successful >= VIP_MIN_SUCCESSFUL || spent >= VIP_MIN_SPENT {
        CustomerSegment::Vip
    } else if total == 1 {
        CustomerSegment::New
    } else {
        CustomerSegment::Regular
    }
}

/// Fold orders into one profile per phone.
///
/// Output is sorted by total spent (descending), then phone, so repeated
/// runs over the same input are identical.
#[must_use]
pub fn aggregate(
    orders: &[Order],
    notes: &[CustomerNote],
    loyalty: Option<&BTreeMap<Phone, i64>>,
) -> Vec<CustomerProfile> {
    let mut by_phone: BTreeMap<&Phone, CustomerProfile> = BTreeMap::new();

    for order in orders {
        let profile = by_phone
            .entry(&order.customer_phone)
            .or_insert_with(|| CustomerProfile {
                phone: order.customer_phone.clone(),
                name: order.customer_name.clone(),
                address: order.customer_address.clone(),
                total_orders: 0,
                successful_orders: 0,
                returned_orders: 0,
                canceled_orders: 0,
                total_spent: Decimal::ZERO,
                first_order_at: order.created_at,
                last_order_at: order.created_at,
                loyalty_points: 0,
                blocked: false,
                notes: String::new(),
                segment: CustomerSegment::New,
            });

        profile.total_orders += 1;
        match order.status {
            s if s.is_successful() => {
                profile.successful_orders += 1;
                profile.total_spent += order.price();
            }
            OrderStatus::Returned => profile.returned_orders += 1,
            OrderStatus::Canceled => profile.canceled_orders += 1,
            _ => {}
        }
        if order.created_at < profile.first_order_at {
            profile.first_order_at = order.created_at;
        }
        if order.created_at >= profile.last_order_at {
            profile.last_order_at = order.created_at;
            profile.name.clone_from(&order.customer_name);
            profile.address.clone_from(&order.customer_address);
        }
    }

    let mut profiles: Vec<CustomerProfile> = by_phone
        .into_values()
        .map(|mut profile| {
            profile.segment = classify(
                profile.total_orders,
                profile.successful_orders,
                profile.returned_orders,
                profile.total_spent,
            );
            if let Some(note) = notes.iter().find(|n| n.phone == profile.phone) {
                profile.blocked = note.blocked;
                profile.notes.clone_from(&note.notes);
            }
            profile.loyalty_points = loyalty
                .and_then(|accounts| accounts.get(&profile.phone))
                .copied()
                .unwrap_or(0);
            profile
        })
        .collect();

    profiles.sort_by(|a, b| {
        b.total_spent
            .cmp(&a.total_spent)
            .then_with(|| a.phone.cmp(&b.phone))
    });
    profiles
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::order::tests::{d, sample_order};

    #[test]
    fn test_orders_with_differently_written_phones_merge() {
        let orders = vec![
            sample_order("01012345678", OrderStatus::Collected, "300"),
            sample_order("+20 101 234 5678", OrderStatus::Delivered, "200"),
            sample_order("01198765432", OrderStatus::PendingCall, "150"),
        ];
        let profiles = aggregate(&orders, &[], None);
        assert_eq!(profiles.len(), 2);
        let first = &profiles[0];
        assert_eq!(first.phone.as_str(), "201012345678");
        assert_eq!(first.total_orders, 2);
        assert_eq!(first.successful_orders, 2);
        assert_eq!(first.total_spent, d("500"));
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let orders = vec![
            sample_order("01012345678", OrderStatus::Collected, "300"),
            sample_order("01198765432", OrderStatus::Returned, "150"),
            sample_order("01198765432", OrderStatus::Collected, "150"),
            sample_order("01222222222", OrderStatus::Canceled, "90"),
        ];
        let notes = vec![CustomerNote {
            phone: Phone::parse("01222222222").unwrap(),
            notes: "Refused twice".to_string(),
            blocked: true,
        }];
        let first = aggregate(&orders, &notes, None);
        let second = aggregate(&orders, &notes, None);
        assert_eq!(first, second);
        assert!(first.iter().any(|p| p.blocked && p.notes == "Refused twice"));
    }

    #[test]
    fn test_latest_order_sets_name() {
        let mut old = sample_order("01012345678", OrderStatus::Collected, "100");
        old.customer_name = "M. Ali".to_string();
        let mut new = sample_order("01012345678", OrderStatus::PendingCall, "100");
        new.customer_name = "Mona Ali".to_string();
        new.created_at = old.created_at + chrono::Duration::days(3);
        let profiles = aggregate(&[new, old], &[], None);
        assert_eq!(profiles[0].name, "Mona Ali");
        assert!(profiles[0].first_order_at < profiles[0].last_order_at);
    }

    #[test]
    fn test_loyalty_points_are_attached() {
        let orders = vec![sample_order("01012345678", OrderStatus::Collected, "100")];
        let mut accounts = BTreeMap::new();
        accounts.insert(Phone::parse("01012345678").unwrap(), 42);
        let profiles = aggregate(&orders, &[], Some(&accounts));
        assert_eq!(profiles[0].loyalty_points, 42);
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(classify(1, 0, 0, Decimal::ZERO), CustomerSegment::New);
        assert_eq!(classify(3, 2, 0, d("900")), CustomerSegment::Regular);
        assert_eq!(classify(5, 5, 0, d("900")), CustomerSegment::Vip);
        assert_eq!(classify(2, 1, 0, d("5000")), CustomerSegment::Vip);
        // 2 of 6 completed returned is 33%.
        assert_eq!(classify(6, 4, 2, d("9000")), CustomerSegment::AtRisk);
        // 2 of 10 is 20%: not at risk.
        assert_eq!(classify(10, 8, 2, d("9000")), CustomerSegment::Vip);
        // One return is never at risk.
        assert_eq!(classify(1, 0, 1, Decimal::ZERO), CustomerSegment::New);
    }
}
