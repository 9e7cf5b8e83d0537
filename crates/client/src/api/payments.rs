//! Payment status and signature verification.

use clubhouse_core::{OrderId, PaymentStatus};
use serde::de::IgnoredAny;
use tracing::instrument;

use super::types::{PaymentStatusUpdate, PaymentVerification, PaymentVerificationRequest};
use super::{ApiClient, ApiError, segment};
use crate::payment::SignedPayment;

impl ApiClient {
    /// Record the outcome of a payment attempt on an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, update), fields(order_id = %order, status = %update.status))]
    pub async fn update_payment_status(
        &self,
        order: &OrderId,
        update: &PaymentStatusUpdate,
    ) -> Result<(), ApiError> {
        let path = format!("orders/{}/payment-status", segment(order.as_str())?);
        let _: IgnoredAny = self.patch(&path, update).await?;
        Ok(())
    }

    /// Ask the backend to verify a gateway callback signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. A signature mismatch is
    /// reported as `verified: false`, not as an error.
    #[instrument(skip(self, payment), fields(order_id = %order, payment_id = %payment.payment_id))]
    pub async fn verify_payment(
        &self,
        order: &OrderId,
        payment: &SignedPayment,
    ) -> Result<PaymentVerification, ApiError> {
        let request = PaymentVerificationRequest {
            order_id: order.clone(),
            gateway_order_id: payment.gateway_order_id.clone(),
            payment_id: payment.payment_id.clone(),
            signature: payment.signature.clone(),
        };
        self.post("payments/verify", &request).await
    }
}

impl PaymentStatusUpdate {
    /// A successful payment.
    #[must_use]
    pub fn paid(payment: &SignedPayment) -> Self {
        Self {
            status: PaymentStatus::Paid,
            gateway_order_id: Some(payment.gateway_order_id.clone()),
            gateway_payment_id: Some(payment.payment_id.clone()),
            failure_reason: None,
        }
    }

    /// A failed or cancelled payment.
    #[must_use]
    pub fn failed(gateway_order_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Failed,
            gateway_order_id,
            gateway_payment_id: None,
            failure_reason: Some(reason.into()),
        }
    }
}
