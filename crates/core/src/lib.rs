//! Clubhouse Core - Shared domain types and checkout pricing.
//!
//! This crate provides the types and rules used across all Clubhouse components:
//! - `client` - Backend API client, session handling and the checkout flow
//! - `cli` - Command-line tools for quoting, lookups and checkout
//!
//! # Architecture
//!
//! The core crate contains only types and pure calculations - no I/O, no
//! HTTP clients, no clocks. Callers pass "now" in explicitly, which keeps
//! every pricing rule deterministic and testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, postal codes and statuses
//! - [`pricing`] - Ticket discounts, order totals and the fee breakdown

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{
    Buyer, DiscountKind, DiscountStep, DiscountValue, EarlyBirdRule, FeeBreakdown, FeeSchedule,
    GroupDiscountRule, MemberDiscountRule, OrderTotals, Payable, PricingError, TicketPricing,
    TicketQuote, merchandise_subtotal,
};
pub use types::*;
