//! Shipping fee and profit calculation.
//!
//! Every courier charges three things on top of the shipping fee the
//! customer pays:
//!
//! - a cash-on-delivery fee on the part of the collected total above a
//!   threshold, plus tax on that fee
//! - an insurance fee as a percentage of the total, for insured parcels
//! - a flat inspection fee for letting the customer open the parcel, unless
//!   the customer pays it
//!
//! Net profit is what is left of the product price after cost and those
//! fees. The shipping fee passes through and never affects profit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::model::Order;
use crate::types::{OrderId, OrderStatus, round2};

/// Cash-on-delivery fee settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CodFeeConfig {
    pub enabled: bool,
    /// Totals up to this amount carry no COD fee.
    pub threshold: Decimal,
    /// Fraction of the amount above the threshold (`0.01` = 1%).
    pub rate: Decimal,
    /// Tax on the fee (`0.14` = 14%).
    pub tax_rate: Decimal,
}

/// Insurance fee settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceConfig {
    pub enabled: bool,
    /// Fraction of the order total.
    pub rate: Decimal,
}

/// Fee configuration of one shipping company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfig {
    #[serde(default)]
    pub cod: CodFeeConfig,
    #[serde(default)]
    pub insurance: InsuranceConfig,
    /// Flat fee per parcel opened for inspection.
    #[serde(default)]
    pub inspection_fee: Decimal,
}

impl FeeConfig {
    /// Reject negative thresholds, rates and fees.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAmount` with the first negative value.
    pub fn validate(&self) -> Result<(), DomainError> {
        [
            self.cod.threshold,
            self.cod.rate,
            self.cod.tax_rate,
            self.insurance.rate,
            self.inspection_fee,
        ]
        .into_iter()
        .find(|value| *value < Decimal::ZERO)
        .map_or(Ok(()), |value| Err(DomainError::InvalidAmount(value)))
    }
}

/// The order figures the calculation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeInput {
    /// Product price after discount.
    pub price: Decimal,
    pub cost: Decimal,
    pub shipping_fee: Decimal,
    pub insured: bool,
    pub inspection_paid_by_customer: bool,
}

impl From<&Order> for FeeInput {
    fn from(order: &Order) -> Self {
        Self {
            price: order.price(),
            cost: order.cost(),
            shipping_fee: order.shipping_fee,
            insured: order.insured,
            inspection_paid_by_customer: order.inspection_paid_by_customer,
        }
    }
}

/// Result of the fee calculation for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub price: Decimal,
    pub cost: Decimal,
    pub shipping_fee: Decimal,
    /// Amount collected from the customer: price + shipping fee.
    pub total: Decimal,
    pub cod_fee: Decimal,
    pub insurance_fee: Decimal,
    pub inspection_fee: Decimal,
    pub net_profit: Decimal,
}

impl FeeBreakdown {
    /// Sum of the courier's fees.
    #[must_use]
    pub fn total_fees(&self) -> Decimal {
        self.cod_fee + self.insurance_fee + self.inspection_fee
    }
}

/// `round2(max(0, total − threshold) · rate · (1 + tax))`, or zero when
/// COD fees are disabled.
#[must_use]
pub fn cod_fee(total: Decimal, config: &CodFeeConfig) -> Decimal {
    if !config.enabled || total <= config.threshold {
        return Decimal::ZERO;
    }
    let taxable = total - config.threshold;
    round2(taxable * config.rate * (Decimal::ONE + config.tax_rate))
}

/// `round2(total · rate)` for insured parcels, otherwise zero.
#[must_use]
pub fn insurance_fee(total: Decimal, insured: bool, config: &InsuranceConfig) -> Decimal {
    if !insured || !config.enabled {
        return Decimal::ZERO;
    }
    round2(total * config.rate)
}

/// Flat inspection fee, waived when the customer pays it.
#[must_use]
pub fn inspection_fee(paid_by_customer: bool, config: &FeeConfig) -> Decimal {
    if paid_by_customer {
        Decimal::ZERO
    } else {
        config.inspection_fee
    }
}

/// Compute all fees and the net profit of an order.
#[must_use]
pub fn calculate(input: &FeeInput, config: &FeeConfig) -> FeeBreakdown {
    let total = input.price + input.shipping_fee;
    let cod = cod_fee(total, &config.cod);
    let insurance = insurance_fee(total, input.insured, &config.insurance);
    let inspection = inspection_fee(input.inspection_paid_by_customer, config);

    FeeBreakdown {
        price: input.price,
        cost: input.cost,
        shipping_fee: input.shipping_fee,
        total,
        cod_fee: cod,
        insurance_fee: insurance,
        inspection_fee: inspection,
        net_profit: input.price - input.cost - insurance - inspection - cod,
    }
}

/// One row of the collections report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionLine {
    pub order_id: OrderId,
    pub number: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub fees: FeeBreakdown,
}

/// Per-order fee breakdown and totals over a set of orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsReport {
    pub lines: Vec<CollectionLine>,
    pub total_collected: Decimal,
    pub total_cod_fees: Decimal,
    pub total_insurance_fees: Decimal,
    pub total_inspection_fees: Decimal,
    pub total_net_profit: Decimal,
}

impl CollectionsReport {
    /// Build a report from `(order, fee config)` pairs.
    ///
    /// Orders without a known shipping company are computed with an empty
    /// fee configuration by the caller.
    #[must_use]
    pub fn build<'a, I>(orders: I) -> Self
    where
        I: IntoIterator<Item = (&'a Order, &'a FeeConfig)>,
    {
        let mut report = Self::default();
        for (order, config) in orders {
            let fees = calculate(&FeeInput::from(order), config);
            report.total_collected += fees.total;
            report.total_cod_fees += fees.cod_fee;
            report.total_insurance_fees += fees.insurance_fee;
            report.total_inspection_fees += fees.inspection_fee;
            report.total_net_profit += fees.net_profit;
            report.lines.push(CollectionLine {
                order_id: order.id.clone(),
                number: order.number,
                status: order.status,
                created_at: order.created_at,
                fees,
            });
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn courier() -> FeeConfig {
        FeeConfig {
            cod: CodFeeConfig {
                enabled: true,
                threshold: d("500"),
                rate: d("0.01"),
                tax_rate: d("0.14"),
            },
            insurance: InsuranceConfig {
                enabled: true,
                rate: d("0.01"),
            },
            inspection_fee: d("20"),
        }
    }

    fn input() -> FeeInput {
        FeeInput {
            price: d("1000"),
            cost: d("600"),
            shipping_fee: d("50"),
            insured: true,
            inspection_paid_by_customer: false,
        }
    }

    #[test]
    fn test_negative_config_values_are_rejected() {
        assert!(courier().validate().is_ok());
        assert!(FeeConfig::default().validate().is_ok());

        let mut config = courier();
        config.insurance.rate = d("-0.01");
        assert_eq!(config.validate(), Err(DomainError::InvalidAmount(d("-0.01"))));

        let mut config = courier();
        config.inspection_fee = d("-20");
        assert_eq!(config.validate(), Err(DomainError::InvalidAmount(d("-20"))));
    }

    #[test]
    fn test_worked_example() {
        let fees = calculate(&input(), &courier());
        assert_eq!(fees.total, d("1050"));
        assert_eq!(fees.cod_fee, d("6.27"));
        assert_eq!(fees.insurance_fee, d("10.5"));
        assert_eq!(fees.inspection_fee, d("20"));
        assert_eq!(fees.net_profit, d("363.23"));
    }

    #[test]
    fn test_cod_fee_zero_at_or_below_threshold() {
        let config = courier().cod;
        assert_eq!(cod_fee(d("500"), &config), Decimal::ZERO);
        assert_eq!(cod_fee(d("120"), &config), Decimal::ZERO);
        assert!(cod_fee(d("500.01"), &config) >= Decimal::ZERO);
    }

    #[test]
    fn test_cod_fee_zero_when_disabled() {
        let mut config = courier().cod;
        config.enabled = false;
        assert_eq!(cod_fee(d("5000"), &config), Decimal::ZERO);
    }

    #[test]
    fn test_cod_fee_matches_formula() {
        let config = courier().cod;
        for total in ["501", "777.77", "1050", "12345.6"] {
            let total = d(total);
            let expected = round2((total - d("500")) * d("0.01") * d("1.14"));
            assert_eq!(cod_fee(total, &config), expected);
        }
    }

    #[test]
    fn test_waivers() {
        let mut input = input();
        input.insured = false;
        input.inspection_paid_by_customer = true;
        let fees = calculate(&input, &courier());
        assert_eq!(fees.insurance_fee, Decimal::ZERO);
        assert_eq!(fees.inspection_fee, Decimal::ZERO);
        assert_eq!(fees.net_profit, d("1000") - d("600") - d("6.27"));
    }

    #[test]
    fn test_net_profit_unaffected_by_shipping_fee_without_cod_or_insurance() {
        let config = FeeConfig {
            inspection_fee: d("15"),
            ..FeeConfig::default()
        };
        let mut cheap = input();
        cheap.shipping_fee = d("0");
        let mut pricey = input();
        pricey.shipping_fee = d("95");
        assert_eq!(
            calculate(&cheap, &config).net_profit,
            calculate(&pricey, &config).net_profit
        );
    }

    #[test]
    fn test_net_profit_identity() {
        let fees = calculate(&input(), &courier());
        assert_eq!(
            fees.net_profit,
            fees.price - fees.cost - fees.insurance_fee - fees.inspection_fee - fees.cod_fee
        );
        assert_eq!(fees.total_fees(), d("36.77"));
    }
}
