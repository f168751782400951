//! Wallet postings triggered by order status changes.
//!
//! Shipping an order costs the store the courier's charges up front;
//! collecting it brings in the cash minus the COD fee. Nothing else moves
//! money.

use crate::fees::FeeBreakdown;
use crate::model::Posting;
use crate::types::{OrderStatus, TransactionCategory};

/// Ledger postings for an order entering `status`.
///
/// Zero-amount postings are included; [`crate::model::Wallet::post`]
/// skips them.
#[must_use]
pub fn postings_for(number: u64, status: OrderStatus, fees: &FeeBreakdown) -> Vec<Posting> {
    match status {
        OrderStatus::Shipped => vec![
            Posting::withdrawal(
                TransactionCategory::Shipping,
                fees.shipping_fee,
                format!("Shipping for order #{number}"),
            ),
            Posting::withdrawal(
                TransactionCategory::Insurance,
                fees.insurance_fee,
                format!("Insurance for order #{number}"),
            ),
            Posting::withdrawal(
                TransactionCategory::Inspection,
                fees.inspection_fee,
                format!("Inspection for order #{number}"),
            ),
        ],
        OrderStatus::Collected => vec![
            Posting::deposit(
                TransactionCategory::Collection,
                fees.total,
                format!("Collected order #{number}"),
            ),
            Posting::withdrawal(
                TransactionCategory::CodFee,
                fees.cod_fee,
                format!("COD fee for order #{number}"),
            ),
        ],
        _ => Vec::new(),
    }
}
