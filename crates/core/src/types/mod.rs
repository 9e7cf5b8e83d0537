//! Core types for Clubhouse.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod coupon;
pub mod email;
pub mod id;
pub mod line_item;
pub mod money;
pub mod postal;
pub mod reservation;
pub mod status;

pub use coupon::{AppliedCoupon, DiscountType};
pub use email::{Email, EmailError};
pub use id::*;
pub use line_item::OrderLineItem;
pub use money::{CurrencyCode, Money};
pub use postal::{PostalCode, PostalCodeError};
pub use reservation::PointsReservation;
pub use status::*;
