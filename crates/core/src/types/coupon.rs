//! Coupons validated by the backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a coupon computes its discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// A fixed amount off.
    #[serde(alias = "fixed")]
    Flat,
    /// A percentage of the order amount.
    Percentage,
}

/// A coupon the backend accepted for a given order amount.
///
/// `discount` is the amount the backend computed for that order;
/// the client applies it as-is and never recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub discount: Decimal,
    pub original_price: Decimal,
    pub final_price: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deserialize_backend_response() {
        let json = r#"{
            "code": "MATCHDAY",
            "name": "Matchday special",
            "discountType": "flat",
            "discountValue": 200,
            "discount": 200,
            "originalPrice": 2550,
            "finalPrice": 2350
        }"#;

        let coupon: AppliedCoupon = serde_json::from_str(json).unwrap();
        assert_eq!(coupon.discount_type, DiscountType::Flat);
        assert_eq!(coupon.discount, dec!(200));
        assert_eq!(coupon.final_price, dec!(2350));
    }
}
