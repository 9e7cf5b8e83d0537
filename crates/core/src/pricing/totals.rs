//! Order totals after coupon, loyalty points, shipping and tax.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{FeeBreakdown, FeeSchedule, PricingError};
use crate::types::money::floor_at_zero;
use crate::types::{CurrencyCode, OrderLineItem};

/// The amounts that make up an order before fees.
///
/// Discounts are the amounts the backend granted (validated coupon,
/// reserved points); they are taken as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub coupon_discount: Decimal,
    pub points_discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
}

/// What the buyer has to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payable {
    /// Nothing to charge; the order goes through the free path.
    Free,
    /// Charge `FeeBreakdown::final_amount` through the payment gateway.
    Paid(FeeBreakdown),
}

impl Payable {
    /// Amount to charge (zero when free).
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        match self {
            Self::Free => Decimal::ZERO,
            Self::Paid(fees) => fees.final_amount,
        }
    }

    #[must_use]
    pub const fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }
}

impl OrderTotals {
    /// Totals for a subtotal with nothing else applied yet.
    #[must_use]
    pub fn new(subtotal: Decimal) -> Self {
        Self {
            subtotal,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_coupon(mut self, discount: Decimal) -> Self {
        self.coupon_discount = discount;
        self
    }

    #[must_use]
    pub const fn with_points(mut self, discount: Decimal) -> Self {
        self.points_discount = discount;
        self
    }

    #[must_use]
    pub const fn with_shipping(mut self, shipping: Decimal) -> Self {
        self.shipping = shipping;
        self
    }

    #[must_use]
    pub const fn with_tax(mut self, tax: Decimal) -> Self {
        self.tax = tax;
        self
    }

    /// `max(0, subtotal - coupon - points + shipping + tax)`.
    ///
    /// Saturates at the `Decimal` bounds instead of overflowing.
    #[must_use]
    pub fn net_payable(&self) -> Decimal {
        floor_at_zero(
            self.subtotal
                .saturating_sub(floor_at_zero(self.coupon_discount))
                .saturating_sub(floor_at_zero(self.points_discount))
                .saturating_add(floor_at_zero(self.shipping))
                .saturating_add(floor_at_zero(self.tax)),
        )
    }

    /// Decide between the free path and a gateway charge.
    #[must_use]
    pub fn settle(&self, fees: &FeeSchedule) -> Payable {
        fees.breakdown(self.net_payable())
            .map_or(Payable::Free, Payable::Paid)
    }
}

/// Sum of the cart's line totals.
///
/// # Errors
///
/// Returns [`PricingError::EmptyCart`] for an empty slice,
/// [`PricingError::CurrencyMismatch`] when lines use different currencies and
/// [`PricingError::Overflow`] when the sum cannot be represented.
pub fn merchandise_subtotal(
    items: &[OrderLineItem],
) -> Result<(Decimal, CurrencyCode), PricingError> {
    let first = items.first().ok_or(PricingError::EmptyCart)?;
    let currency = first.currency;

    items.iter().try_fold((Decimal::ZERO, currency), |(sum, currency), item| {
        if item.currency != currency {
            return Err(PricingError::CurrencyMismatch {
                expected: currency,
                found: item.currency,
            });
        }
        let line = item.line_total().ok_or(PricingError::Overflow)?;
        let sum = sum
            .checked_add(floor_at_zero(line))
            .ok_or(PricingError::Overflow)?;
        Ok((sum, currency))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ClubId, ProductId};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn item(price: Decimal, quantity: u32, currency: CurrencyCode) -> OrderLineItem {
        OrderLineItem {
            product_id: ProductId::new("scarf"),
            unit_price: price,
            quantity,
            currency,
            club_id: ClubId::new("club-1"),
        }
    }

    #[test]
    fn test_ticket_example_end_to_end() {
        let totals = OrderTotals::new(dec!(2550))
            .with_coupon(dec!(200))
            .with_points(dec!(100));

        assert_eq!(totals.net_payable(), dec!(2250));

        let Payable::Paid(fees) = totals.settle(&FeeSchedule::default()) else {
            panic!("expected a paid order");
        };
        assert_eq!(fees.net, dec!(2250));
        assert_eq!(fees.final_amount, dec!(2435.85));
    }

    #[test]
    fn test_discounts_never_go_below_zero() {
        let totals = OrderTotals::new(dec!(300))
            .with_coupon(dec!(250))
            .with_points(dec!(400));
        assert_eq!(totals.net_payable(), Decimal::ZERO);
        assert_eq!(totals.settle(&FeeSchedule::default()), Payable::Free);
    }

    #[test]
    fn test_shipping_and_tax_added_after_discounts() {
        let totals = OrderTotals::new(dec!(1000))
            .with_coupon(dec!(100))
            .with_shipping(dec!(60))
            .with_tax(dec!(45));
        assert_eq!(totals.net_payable(), dec!(1005));
    }

    #[test]
    fn test_merchandise_subtotal() {
        let items = [
            item(dec!(499), 2, CurrencyCode::INR),
            item(dec!(150.50), 1, CurrencyCode::INR),
        ];
        assert_eq!(
            merchandise_subtotal(&items).unwrap(),
            (dec!(1148.50), CurrencyCode::INR)
        );
    }

    #[test]
    fn test_merchandise_subtotal_errors() {
        assert_eq!(merchandise_subtotal(&[]), Err(PricingError::EmptyCart));

        let items = [
            item(dec!(10), 1, CurrencyCode::INR),
            item(dec!(10), 1, CurrencyCode::USD),
        ];
        assert_eq!(
            merchandise_subtotal(&items),
            Err(PricingError::CurrencyMismatch {
                expected: CurrencyCode::INR,
                found: CurrencyCode::USD,
            })
        );
    }

    #[test]
    fn test_huge_cart_is_an_overflow_error() {
        let one_line = [item(Decimal::MAX, 2, CurrencyCode::INR)];
        assert_eq!(merchandise_subtotal(&one_line), Err(PricingError::Overflow));

        let two_lines = [
            item(Decimal::MAX, 1, CurrencyCode::INR),
            item(dec!(1), 1, CurrencyCode::INR),
        ];
        assert_eq!(merchandise_subtotal(&two_lines), Err(PricingError::Overflow));
    }

    #[test]
    fn test_net_payable_saturates() {
        let totals = OrderTotals::new(Decimal::MAX)
            .with_shipping(dec!(120))
            .with_tax(dec!(18));
        assert_eq!(totals.net_payable(), Decimal::MAX);
    }

    proptest! {
        #[test]
        fn prop_net_payable_never_negative(
            subtotal in 0i64..100_000,
            coupon in 0i64..100_000,
            points in 0i64..100_000,
        ) {
            let totals = OrderTotals::new(Decimal::from(subtotal))
                .with_coupon(Decimal::from(coupon))
                .with_points(Decimal::from(points));

            prop_assert!(totals.net_payable() >= Decimal::ZERO);
            match totals.settle(&FeeSchedule::default()) {
                Payable::Free => prop_assert_eq!(totals.net_payable(), Decimal::ZERO),
                Payable::Paid(fees) => {
                    prop_assert!(fees.net > Decimal::ZERO);
                    prop_assert_eq!(fees.final_amount, fees.net + fees.total_fees());
                }
            }
        }
    }
}
