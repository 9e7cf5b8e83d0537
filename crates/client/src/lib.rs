//! Clubhouse client library.
//!
//! Everything a front end needs to talk to the Clubhouse backend and run a
//! checkout:
//!
//! - [`config`] - Environment-driven configuration
//! - [`session`] - Explicit session context (bearer token, user type) and its persistence
//! - [`api`] - Typed REST client for clubs, events, merchandise, coupons, points and payments
//! - [`coupon`] / [`reservation`] - Coupon slot and loyalty-point reservations
//! - [`shipping`] - Debounced courier-rate lookup
//! - [`payment`] - Payment gateway hand-off and signature checks
//! - [`checkout`] - The checkout submission state machine
//!
//! All business rules beyond pricing live in the backend; this crate never
//! retries a failed request.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod coupon;
pub mod error;
pub mod payment;
pub mod reservation;
pub mod session;
pub mod shipping;

pub use api::{ApiClient, ApiError};
pub use checkout::{
    Checkout, CheckoutError, CheckoutEvent, CheckoutForm, CheckoutKind, CheckoutReceipt,
    CheckoutState, FormError,
};
pub use config::{ClientConfig, ConfigError};
pub use error::{Categorized, ErrorCategory, Notice, NoticeKind};
pub use payment::{GatewayOrder, PaymentGateway, PaymentOutcome, SignedPayment};
pub use session::{AuthContext, FileSessionStore, MemorySessionStore, Session, SessionError};
pub use shipping::{RateLookup, ShippingState, ShiprocketClient};
