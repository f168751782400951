//! Decimal money helpers and store currencies.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round to two decimal places, halves away from zero.
///
/// Fee math matches what merchants see on courier invoices, which round
/// `x.xx5` up rather than to even.
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Currency a store prices its catalog in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EGP,
    SAR,
    AED,
    KWD,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Display suffix used on dashboards and invoices.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::EGP => "ج.م",
            Self::SAR => "ر.س",
            Self::AED => "د.إ",
            Self::KWD => "د.ك",
            Self::USD => "$",
            Self::EUR => "€",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EGP => "EGP",
            Self::SAR => "SAR",
            Self::AED => "AED",
            Self::KWD => "KWD",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EGP" => Ok(Self::EGP),
            "SAR" => Ok(Self::SAR),
            "AED" => Ok(Self::AED),
            "KWD" => Ok(Self::KWD),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

/// An amount with its currency, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: CurrencyCode,
}

impl Money {
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = round2(self.amount);
        match self.currency {
            CurrencyCode::USD | CurrencyCode::EUR => {
                write!(f, "{}{amount:.2}", self.currency.symbol())
            }
            _ => write!(f, "{amount:.2} {}", self.currency.symbol()),
        }
    }
}
