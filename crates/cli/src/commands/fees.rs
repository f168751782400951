//! Fee calculation from the command line.

use clap::Args;
use rust_decimal::Decimal;

use souq_core::fees::{self, CodFeeConfig, InsuranceConfig};
use souq_core::{FeeBreakdown, FeeConfig, FeeInput};

#[derive(Debug, Args)]
pub struct FeeArgs {
    /// Product price after discount
    #[arg(long)]
    pub price: Decimal,

    /// Product cost
    #[arg(long, default_value = "0")]
    pub cost: Decimal,

    /// Shipping fee paid by the customer
    #[arg(long, default_value = "0")]
    pub shipping_fee: Decimal,

    /// Totals up to this amount carry no COD fee (enables COD when set)
    #[arg(long)]
    pub cod_threshold: Option<Decimal>,

    /// COD rate on the amount above the threshold (0.01 = 1%)
    #[arg(long, default_value = "0")]
    pub cod_rate: Decimal,

    /// Tax on the COD fee (0.14 = 14%)
    #[arg(long, default_value = "0")]
    pub cod_tax: Decimal,

    /// Insurance rate on the total (enables insurance when set)
    #[arg(long)]
    pub insurance_rate: Option<Decimal>,

    /// The parcel is insured
    #[arg(long)]
    pub insured: bool,

    /// Flat fee for opening the parcel
    #[arg(long, default_value = "0")]
    pub inspection_fee: Decimal,

    /// The customer pays the inspection fee
    #[arg(long)]
    pub customer_pays_inspection: bool,
}

impl FeeArgs {
    fn config(&self) -> FeeConfig {
        FeeConfig {
            cod: CodFeeConfig {
                enabled: self.cod_threshold.is_some(),
                threshold: self.cod_threshold.unwrap_or_default(),
                rate: self.cod_rate,
                tax_rate: self.cod_tax,
            },
            insurance: InsuranceConfig {
                enabled: self.insurance_rate.is_some(),
                rate: self.insurance_rate.unwrap_or_default(),
            },
            inspection_fee: self.inspection_fee,
        }
    }

    const fn input(&self) -> FeeInput {
        FeeInput {
            price: self.price,
            cost: self.cost,
            shipping_fee: self.shipping_fee,
            insured: self.insured,
            inspection_paid_by_customer: self.customer_pays_inspection,
        }
    }
}

#[must_use]
pub fn breakdown(args: &FeeArgs) -> FeeBreakdown {
    fees::calculate(&args.input(), &args.config())
}
