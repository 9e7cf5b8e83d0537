//! Event ticket discount rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PricingError;
use crate::types::CurrencyCode;
use crate::types::money::floor_at_zero;

/// A discount expressed as a percentage of the current price or a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountValue {
    /// Percent of the price the rule is applied to (10 means 10%).
    Percentage(Decimal),
    /// A fixed amount in the ticket's currency.
    Fixed(Decimal),
}

impl DiscountValue {
    /// How much this discount takes off `price`.
    ///
    /// Never negative and never more than `price` itself. Percentages are
    /// clamped to `0..=100`, so the product never exceeds `price`.
    #[must_use]
    pub fn amount_off(self, price: Decimal) -> Decimal {
        let price = floor_at_zero(price);
        let raw = match self {
            Self::Percentage(percent) => {
                let percent = floor_at_zero(percent).min(Decimal::ONE_HUNDRED);
                price * (percent / Decimal::ONE_HUNDRED)
            }
            Self::Fixed(amount) => floor_at_zero(amount),
        };
        raw.min(price)
    }

    /// `price` with this discount applied, floored at zero.
    #[must_use]
    pub fn apply(self, price: Decimal) -> Decimal {
        floor_at_zero(price) - self.amount_off(price)
    }
}

/// Early-bird pricing, valid inside an inclusive time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarlyBirdRule {
    pub value: DiscountValue,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub members_only: bool,
}

impl EarlyBirdRule {
    /// Whether the rule applies to `buyer` at `now`.
    #[must_use]
    pub fn applies(&self, buyer: Buyer, now: DateTime<Utc>) -> bool {
        (!self.members_only || buyer.is_active_member)
            && now >= self.starts_at
            && now <= self.ends_at
    }
}

/// Discount for buyers with an active club membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDiscountRule {
    pub value: DiscountValue,
}

/// Discount for registrations with enough attendees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDiscountRule {
    pub value: DiscountValue,
    pub min_attendees: u32,
}

/// Who is buying, as far as pricing cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buyer {
    pub is_active_member: bool,
}

impl Buyer {
    #[must_use]
    pub const fn member() -> Self {
        Self {
            is_active_member: true,
        }
    }

    #[must_use]
    pub const fn guest() -> Self {
        Self {
            is_active_member: false,
        }
    }
}

/// Ticket price and the discount rules enabled for an event.
///
/// A rule that is `None` is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPricing {
    pub ticket_price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub early_bird: Option<EarlyBirdRule>,
    #[serde(default)]
    pub member_discount: Option<MemberDiscountRule>,
    #[serde(default)]
    pub group_discount: Option<GroupDiscountRule>,
}

/// Which rule produced a [`DiscountStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    EarlyBird,
    Member,
    Group,
}

/// One applied discount and the per-ticket price right after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiscountStep {
    pub kind: DiscountKind,
    pub amount_off: Decimal,
    pub price_after: Decimal,
}

/// The result of pricing a ticket registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketQuote {
    pub ticket_price: Decimal,
    pub currency: CurrencyCode,
    /// Discounts in the order they were applied; skipped rules are absent.
    pub steps: Vec<DiscountStep>,
    pub per_ticket: Decimal,
    pub attendees: u32,
    pub subtotal: Decimal,
}

impl TicketQuote {
    /// The step for `kind`, if that rule applied.
    #[must_use]
    pub fn step(&self, kind: DiscountKind) -> Option<&DiscountStep> {
        self.steps.iter().find(|s| s.kind == kind)
    }
}

impl TicketPricing {
    /// Price a registration of `attendees` tickets for `buyer` at `now`.
    ///
    /// Rules are applied in a fixed order (early-bird, member, group), each
    /// to the price left by the previous one, and each result is floored at
    /// zero on its own.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::NoAttendees`] when `attendees` is zero and
    /// [`PricingError::Overflow`] when the subtotal cannot be represented.
    pub fn quote(
        &self,
        buyer: Buyer,
        attendees: u32,
        now: DateTime<Utc>,
    ) -> Result<TicketQuote, PricingError> {
        if attendees == 0 {
            return Err(PricingError::NoAttendees);
        }

        let mut price = floor_at_zero(self.ticket_price);
        let mut steps = Vec::with_capacity(3);

        let mut apply = |kind: DiscountKind, value: DiscountValue, price: &mut Decimal| {
            let amount_off = value.amount_off(*price);
            *price = value.apply(*price);
            steps.push(DiscountStep {
                kind,
                amount_off,
                price_after: *price,
            });
        };

        if let Some(rule) = self.early_bird.as_ref().filter(|r| r.applies(buyer, now)) {
            apply(DiscountKind::EarlyBird, rule.value, &mut price);
        }

        if let Some(rule) = self.member_discount.filter(|_| buyer.is_active_member) {
            apply(DiscountKind::Member, rule.value, &mut price);
        }

        if let Some(rule) = self.group_discount.filter(|r| attendees >= r.min_attendees) {
            apply(DiscountKind::Group, rule.value, &mut price);
        }

        let subtotal = price
            .checked_mul(Decimal::from(attendees))
            .ok_or(PricingError::Overflow)?;

        Ok(TicketQuote {
            ticket_price: self.ticket_price,
            currency: self.currency,
            steps,
            per_ticket: price,
            attendees,
            subtotal,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn early_bird(value: DiscountValue, members_only: bool) -> EarlyBirdRule {
        EarlyBirdRule {
            value,
            starts_at: now() - Duration::days(7),
            ends_at: now() + Duration::days(7),
            members_only,
        }
    }

    fn matchday_pricing() -> TicketPricing {
        TicketPricing {
            ticket_price: dec!(1000),
            currency: CurrencyCode::INR,
            early_bird: Some(early_bird(DiscountValue::Percentage(dec!(10)), false)),
            member_discount: Some(MemberDiscountRule {
                value: DiscountValue::Fixed(dec!(50)),
            }),
            group_discount: Some(GroupDiscountRule {
                value: DiscountValue::Fixed(dec!(100)),
                min_attendees: 5,
            }),
        }
    }

    #[test]
    fn test_quote_applies_rules_in_order() {
        let quote = matchday_pricing().quote(Buyer::member(), 3, now()).unwrap();

        assert_eq!(quote.step(DiscountKind::EarlyBird).unwrap().price_after, dec!(900));
        assert_eq!(quote.step(DiscountKind::Member).unwrap().price_after, dec!(850));
        assert!(quote.step(DiscountKind::Group).is_none());
        assert_eq!(quote.per_ticket, dec!(850));
        assert_eq!(quote.subtotal, dec!(2550));
    }

    #[test]
    fn test_percentage_applies_to_current_price() {
        let pricing = TicketPricing {
            group_discount: Some(GroupDiscountRule {
                value: DiscountValue::Percentage(dec!(10)),
                min_attendees: 2,
            }),
            ..matchday_pricing()
        };

        // 1000 -> 900 (early bird) -> 850 (member) -> 765 (10% of 850 off)
        let quote = pricing.quote(Buyer::member(), 2, now()).unwrap();
        assert_eq!(quote.per_ticket, dec!(765));
        assert_eq!(quote.subtotal, dec!(1530));
    }

    #[test]
    fn test_guest_gets_no_member_discount() {
        let quote = matchday_pricing().quote(Buyer::guest(), 1, now()).unwrap();
        assert_eq!(quote.per_ticket, dec!(900));
        assert!(quote.step(DiscountKind::Member).is_none());
    }

    #[test]
    fn test_members_only_early_bird() {
        let pricing = TicketPricing {
            early_bird: Some(early_bird(DiscountValue::Fixed(dec!(200)), true)),
            member_discount: None,
            group_discount: None,
            ..matchday_pricing()
        };

        assert_eq!(pricing.quote(Buyer::guest(), 1, now()).unwrap().per_ticket, dec!(1000));
        assert_eq!(pricing.quote(Buyer::member(), 1, now()).unwrap().per_ticket, dec!(800));
    }

    #[test]
    fn test_early_bird_window_is_inclusive() {
        let rule = early_bird(DiscountValue::Fixed(dec!(1)), false);
        assert!(rule.applies(Buyer::guest(), rule.starts_at));
        assert!(rule.applies(Buyer::guest(), rule.ends_at));
        assert!(!rule.applies(Buyer::guest(), rule.ends_at + Duration::seconds(1)));
        assert!(!rule.applies(Buyer::guest(), rule.starts_at - Duration::seconds(1)));
    }

    #[test]
    fn test_group_threshold() {
        let pricing = matchday_pricing();
        assert!(pricing.quote(Buyer::guest(), 4, now()).unwrap().step(DiscountKind::Group).is_none());

        let quote = pricing.quote(Buyer::guest(), 5, now()).unwrap();
        assert_eq!(quote.per_ticket, dec!(800));
        assert_eq!(quote.subtotal, dec!(4000));
    }

    #[test]
    fn test_each_step_floors_independently() {
        let pricing = TicketPricing {
            ticket_price: dec!(100),
            currency: CurrencyCode::INR,
            early_bird: Some(early_bird(DiscountValue::Fixed(dec!(150)), false)),
            member_discount: Some(MemberDiscountRule {
                value: DiscountValue::Fixed(dec!(20)),
            }),
            group_discount: None,
        };

        let quote = pricing.quote(Buyer::member(), 1, now()).unwrap();
        let early = quote.step(DiscountKind::EarlyBird).unwrap();
        assert_eq!(early.amount_off, dec!(100));
        assert_eq!(early.price_after, Decimal::ZERO);
        // The excess 50 does not carry over into the member step.
        assert_eq!(quote.step(DiscountKind::Member).unwrap().amount_off, Decimal::ZERO);
        assert_eq!(quote.per_ticket, Decimal::ZERO);
    }

    #[test]
    fn test_zero_attendees_rejected() {
        assert_eq!(
            matchday_pricing().quote(Buyer::member(), 0, now()),
            Err(PricingError::NoAttendees)
        );
    }

    #[test]
    fn test_percentage_above_hundred_is_full_price() {
        let huge = DiscountValue::Percentage(Decimal::MAX);
        assert_eq!(huge.amount_off(dec!(1000)), dec!(1000));
        assert_eq!(huge.apply(dec!(1000)), Decimal::ZERO);
        assert_eq!(huge.amount_off(Decimal::MAX), Decimal::MAX);
        assert_eq!(DiscountValue::Percentage(dec!(150)).apply(dec!(80)), Decimal::ZERO);
    }

    #[test]
    fn test_subtotal_overflow_is_an_error() {
        let pricing = TicketPricing {
            ticket_price: Decimal::MAX,
            currency: CurrencyCode::INR,
            early_bird: None,
            member_discount: None,
            group_discount: None,
        };

        assert_eq!(pricing.quote(Buyer::member(), 1, now()).unwrap().subtotal, Decimal::MAX);
        assert_eq!(
            pricing.quote(Buyer::guest(), 2, now()),
            Err(PricingError::Overflow)
        );
    }

    #[test]
    fn test_deserialize_event_pricing() {
        let json = r#"{
            "ticketPrice": "1000",
            "earlyBird": {
                "value": {"type": "percentage", "value": "10"},
                "startsAt": "2026-02-01T00:00:00Z",
                "endsAt": "2026-03-15T00:00:00Z",
                "membersOnly": true
            },
            "groupDiscount": {
                "value": {"type": "fixed", "value": "75"},
                "minAttendees": 4
            }
        }"#;

        let pricing: TicketPricing = serde_json::from_str(json).unwrap();
        assert_eq!(pricing.currency, CurrencyCode::INR);
        assert!(pricing.early_bird.unwrap().members_only);
        assert!(pricing.member_discount.is_none());
        assert_eq!(pricing.group_discount.unwrap().min_attendees, 4);
    }

    fn discount_value() -> impl Strategy<Value = DiscountValue> {
        prop_oneof![
            (-50i64..250).prop_map(|p| DiscountValue::Percentage(Decimal::from(p))),
            (-500i64..5000).prop_map(|f| DiscountValue::Fixed(Decimal::from(f))),
        ]
    }

    proptest! {
        #[test]
        fn prop_per_ticket_within_bounds(
            price in 0i64..10_000,
            early in proptest::option::of(discount_value()),
            member in proptest::option::of(discount_value()),
            group in proptest::option::of(discount_value()),
            is_member in any::<bool>(),
            attendees in 1u32..20,
        ) {
            let pricing = TicketPricing {
                ticket_price: Decimal::from(price),
                currency: CurrencyCode::INR,
                early_bird: early.map(|value| early_bird(value, false)),
                member_discount: member.map(|value| MemberDiscountRule { value }),
                group_discount: group.map(|value| GroupDiscountRule { value, min_attendees: 2 }),
            };
            let buyer = Buyer { is_active_member: is_member };

            let quote = pricing.quote(buyer, attendees, now()).unwrap();
            prop_assert!(quote.per_ticket >= Decimal::ZERO);
            prop_assert!(quote.per_ticket <= pricing.ticket_price);
            for step in &quote.steps {
                prop_assert!(step.price_after >= Decimal::ZERO);
                prop_assert!(step.amount_off >= Decimal::ZERO);
            }
        }
    }
}
