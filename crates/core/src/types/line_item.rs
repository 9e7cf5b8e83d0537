//! Cart and order line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ClubId, CurrencyCode, ProductId};

/// A product in the cart, later submitted as part of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub product_id: ProductId,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub club_id: ClubId,
}

impl OrderLineItem {
    /// Unit price multiplied by quantity, or `None` if that overflows.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}
