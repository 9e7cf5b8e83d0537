//! Platform and payment-gateway fees.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::money::{floor_at_zero, round_minor};

/// Fee percentages added on top of the net payable amount.
///
/// All values are percents (`5` means 5%). GST rates apply to the fee they
/// follow, not to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    pub platform_rate: Decimal,
    pub platform_gst_rate: Decimal,
    pub gateway_rate: Decimal,
    pub gateway_gst_rate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_rate: dec!(5),
            platform_gst_rate: dec!(18),
            gateway_rate: dec!(2),
            gateway_gst_rate: dec!(18),
        }
    }
}

/// Fees for one order. Derived on every total change, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub net: Decimal,
    pub platform_fee: Decimal,
    pub platform_fee_gst: Decimal,
    pub gateway_fee: Decimal,
    pub gateway_fee_gst: Decimal,
    pub final_amount: Decimal,
}

impl FeeBreakdown {
    /// Sum of all four fee components.
    #[must_use]
    pub fn total_fees(&self) -> Decimal {
        self.platform_fee + self.platform_fee_gst + self.gateway_fee + self.gateway_fee_gst
    }
}

impl FeeSchedule {
    /// Compute fees for `net`.
    ///
    /// Returns `None` unless `net`, rounded to paise, is strictly positive. Each component is
    /// rounded to paise before being summed into `final_amount`.
    #[must_use]
    pub fn breakdown(&self, net: Decimal) -> Option<FeeBreakdown> {
        let net = round_minor(net);
        if net <= Decimal::ZERO {
            return None;
        }

        let platform_fee = percent_of(net, self.platform_rate);
        let platform_fee_gst = percent_of(platform_fee, self.platform_gst_rate);
        let gateway_fee = percent_of(net, self.gateway_rate);
        let gateway_fee_gst = percent_of(gateway_fee, self.gateway_gst_rate);

        Some(FeeBreakdown {
            net,
            platform_fee,
            platform_fee_gst,
            gateway_fee,
            gateway_fee_gst,
            final_amount: net
                .saturating_add(platform_fee)
                .saturating_add(platform_fee_gst)
                .saturating_add(gateway_fee)
                .saturating_add(gateway_fee_gst),
        })
    }
}

fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_minor(amount.saturating_mul(floor_at_zero(percent) / Decimal::ONE_HUNDRED))
}
