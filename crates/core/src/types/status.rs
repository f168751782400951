//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// ```text
/// pending_call → no_answer | in_review | canceled
/// no_answer    → pending_call | in_review | canceled
/// in_review    → pending_call | shipped | canceled
/// shipped      → delivered | returned
/// delivered    → collected | returned
/// ```
///
/// `collected`, `canceled` and `returned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for a confirmation call.
    #[default]
    PendingCall,
    /// Called, nobody picked up.
    NoAnswer,
    /// Confirmed by phone, being prepared.
    InReview,
    /// Handed to the shipping company.
    Shipped,
    /// Delivered to the customer; cash still with the courier.
    Delivered,
    /// Cash collected from the courier into the wallet.
    Collected,
    /// Canceled before shipping.
    Canceled,
    /// Refused or returned after shipping.
    Returned,
}

impl OrderStatus {
    pub const ALL: [Self; 8] = [
        Self::PendingCall,
        Self::NoAnswer,
        Self::InReview,
        Self::Shipped,
        Self::Delivered,
        Self::Collected,
        Self::Canceled,
        Self::Returned,
    ];

    /// Whether the lifecycle allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::PendingCall,
                Self::NoAnswer | Self::InReview | Self::Canceled
            ) | (
                Self::NoAnswer,
                Self::PendingCall | Self::InReview | Self::Canceled
            ) | (
                Self::InReview,
                Self::PendingCall | Self::Shipped | Self::Canceled
            ) | (Self::Shipped, Self::Delivered | Self::Returned)
                | (Self::Delivered, Self::Collected | Self::Returned)
        )
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Collected | Self::Canceled | Self::Returned)
    }

    /// Reached the customer and was paid for.
    #[must_use]
    pub const fn is_successful(self) -> bool {
        matches!(self, Self::Delivered | Self::Collected)
    }

    /// Still waiting in the confirmation queue.
    #[must_use]
    pub const fn awaits_confirmation(self) -> bool {
        matches!(self, Self::PendingCall | Self::NoAnswer)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingCall => "pending_call",
            Self::NoAnswer => "no_answer",
            Self::InReview => "in_review",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Collected => "collected",
            Self::Canceled => "canceled",
            Self::Returned => "returned",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Outcome of a confirmation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Confirmed,
    NoAnswer,
    Rejected,
    /// Customer asked to be called later.
    Postponed,
}

impl CallOutcome {
    /// Status the order moves to after this outcome, if any.
    #[must_use]
    pub const fn resulting_status(self) -> Option<OrderStatus> {
        match self {
            Self::Confirmed => Some(OrderStatus::InReview),
            Self::NoAnswer => Some(OrderStatus::NoAnswer),
            Self::Rejected => Some(OrderStatus::Canceled),
            Self::Postponed => None,
        }
    }
}

/// Where an order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    /// Entered by staff on the dashboard.
    #[default]
    Manual,
    /// Placed through the public storefront checkout.
    Storefront,
}

/// Direction of a wallet ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

/// What a ledger entry was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Shipping,
    Insurance,
    Inspection,
    CodFee,
    /// Cash collected for a delivered order.
    Collection,
    /// Operating expense recorded by staff.
    Expense,
    Manual,
}

/// Employee membership status within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    #[default]
    Invited,
    Active,
    Removed,
}

impl EmployeeStatus {
    /// `invited → active`, `invited → removed`, `active → removed`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Invited, Self::Active | Self::Removed) | (Self::Active, Self::Removed)
        )
    }
}

/// Dashboard areas an employee can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Orders,
    ConfirmationQueue,
    Wallet,
    Customers,
    Products,
    Settings,
    Employees,
    Marketing,
}

impl Permission {
    pub const ALL: [Self; 8] = [
        Self::Orders,
        Self::ConfirmationQueue,
        Self::Wallet,
        Self::Customers,
        Self::Products,
        Self::Settings,
        Self::Employees,
        Self::Marketing,
    ];
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Orders => "orders",
            Self::ConfirmationQueue => "confirmation_queue",
            Self::Wallet => "wallet",
            Self::Customers => "customers",
            Self::Products => "products",
            Self::Settings => "settings",
            Self::Employees => "employees",
            Self::Marketing => "marketing",
        };
        f.write_str(name)
    }
}

/// Customer classification derived from order history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSegment {
    Vip,
    AtRisk,
    New,
    Regular,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_cannot_ship_unconfirmed_order() {
        assert!(!OrderStatus::PendingCall.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::NoAnswer.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::InReview.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_cannot_cancel_after_shipping() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Canceled));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Returned));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_employee_transitions() {
        assert!(EmployeeStatus::Invited.can_transition_to(EmployeeStatus::Active));
        assert!(EmployeeStatus::Invited.can_transition_to(EmployeeStatus::Removed));
        assert!(EmployeeStatus::Active.can_transition_to(EmployeeStatus::Removed));
        assert!(!EmployeeStatus::Removed.can_transition_to(EmployeeStatus::Active));
        assert!(!EmployeeStatus::Active.can_transition_to(EmployeeStatus::Invited));
    }

    #[test]
    fn test_call_outcomes() {
        assert_eq!(
            CallOutcome::Confirmed.resulting_status(),
            Some(OrderStatus::InReview)
        );
        assert_eq!(CallOutcome::Postponed.resulting_status(), None);
    }
}
