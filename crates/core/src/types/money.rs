//! Decimal money amounts.
//!
//! All arithmetic uses `rust_decimal`; amounts are rounded to the currency's
//! minor unit (two places) only where a value is presented or charged.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes accepted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter code as sent to the payment gateway.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An amount of money in a currency's standard unit (rupees, not paise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Create an INR amount.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Subtract `amount`, flooring the result at zero.
    #[must_use]
    pub fn saturating_sub(self, amount: Decimal) -> Self {
        Self::new(floor_at_zero(self.amount - amount), self.currency)
    }

    /// Round to the minor unit, midpoint away from zero.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self::new(round_minor(self.amount), self.currency)
    }

    /// Amount in minor units (paise for INR), as payment gateways expect.
    ///
    /// Negative amounts map to zero. Returns `None` when the amount does not
    /// fit in a `u64`.
    #[must_use]
    pub fn to_minor_units(self) -> Option<u64> {
        use rust_decimal::prelude::ToPrimitive;
        round_minor(floor_at_zero(self.amount))
            .checked_mul(Decimal::ONE_HUNDRED)?
            .to_u64()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), round_minor(self.amount))
    }
}

/// Clamp negative amounts to zero.
#[must_use]
pub fn floor_at_zero(amount: Decimal) -> Decimal {
    amount.max(Decimal::ZERO)
}

/// Round to two decimal places, midpoint away from zero.
#[must_use]
pub fn round_minor(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
