//! Checkout pricing.
//!
//! Prices flow through three stages:
//!
//! 1. [`TicketPricing::quote`] applies the event's discount rules per ticket
//!    (early-bird, then member, then group) and multiplies by attendees.
//! 2. [`OrderTotals`] deducts the backend-validated coupon and the reserved
//!    loyalty-point discount, then adds shipping and tax.
//! 3. [`FeeSchedule::breakdown`] adds the platform and gateway fees (each with
//!    GST) to a strictly positive net amount.
//!
//! A zero net amount settles as [`Payable::Free`]: such orders skip the payment
//! gateway entirely.

mod fees;
mod ticket;
mod totals;

pub use fees::{FeeBreakdown, FeeSchedule};
pub use ticket::{
    Buyer, DiscountKind, DiscountStep, DiscountValue, EarlyBirdRule, GroupDiscountRule,
    MemberDiscountRule, TicketPricing, TicketQuote,
};
pub use totals::{OrderTotals, Payable, merchandise_subtotal};

use thiserror::Error;

use crate::types::CurrencyCode;

/// Errors raised while pricing an order.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// A ticket quote was requested for nobody.
    #[error("at least one attendee is required")]
    NoAttendees,

    /// A merchandise order without items.
    #[error("cart is empty")]
    EmptyCart,

    /// Cart lines priced in different currencies.
    #[error("cart mixes currencies ({expected} and {found})")]
    CurrencyMismatch {
        expected: CurrencyCode,
        found: CurrencyCode,
    },

    /// An amount too large to represent or to charge.
    #[error("amount is out of range")]
    Overflow,
}
