//! Payment gateway hand-off.
//!
//! A paid checkout creates a pending order on the backend, which opens a
//! gateway order. The [`PaymentGateway`] collects the payment (a popup in a
//! browser, a prompt on a terminal) and reports a [`PaymentOutcome`]. Signed
//! callbacks are verified server-side; [`razorpay`] holds the signature
//! scheme for test doubles and tooling.

pub mod razorpay;

use std::future::Future;

use clubhouse_core::{CurrencyCode, OrderId};
use serde::{Deserialize, Serialize};

/// Buyer details pre-filled in the gateway form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// Everything the gateway needs to take a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Backend order the payment belongs to.
    pub order_id: OrderId,
    pub gateway_order_id: String,
    /// Amount in minor units (paise for INR).
    pub amount_minor: u64,
    pub currency: CurrencyCode,
    /// Public gateway key; `None` when not configured.
    pub key_id: Option<String>,
    pub description: String,
    pub prefill: Prefill,
}

/// The gateway's signed success callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayment {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// How a payment attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded(SignedPayment),
    Failed { reason: String },
    /// The buyer closed the gateway without paying.
    Cancelled,
}

/// Collects a payment for a gateway order.
pub trait PaymentGateway: Send + Sync {
    fn collect(&self, order: &GatewayOrder) -> impl Future<Output = PaymentOutcome> + Send;
}
