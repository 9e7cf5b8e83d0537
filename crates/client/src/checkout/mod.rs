//! Checkout submission.
//!
//! A [`Checkout`] collects the buyer's details, an optional coupon and
//! loyalty-point hold and (for merchandise) a shipping quote, then submits the
//! order:
//!
//! ```text
//! Editing -> Submitting -> Confirmed -------> Finalized      (nothing to pay)
//!                      \-> AwaitingPayment -> Finalized      (gateway success)
//!                                         \-> Failed         (gateway failure/cancel)
//! ```
//!
//! Validation problems and network failures before an order exists return the
//! checkout to `Editing`. Every transition and notice is sent on the event
//! channel returned by [`Checkout::new`].

mod events;
mod form;

use chrono::{DateTime, Utc};
use clubhouse_core::{
    Buyer, ClubId, CurrencyCode, FeeBreakdown, FeeSchedule, Money, OrderId, OrderLineItem,
    OrderTotals, PaymentStatus, Payable, PricingError, merchandise_subtotal,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::instrument;

use crate::api::{
    ApiClient, ApiError, CreatedOrder, Event, EventOrderRequest, MerchandiseOrderRequest,
    OrderAmounts, PaymentStatusUpdate,
};
use crate::coupon::{CouponError, CouponSlot};
use crate::error::{Categorized, ErrorCategory, Notice, add_breadcrumb, report};
use crate::payment::{GatewayOrder, PaymentGateway, PaymentOutcome, Prefill, SignedPayment};
use crate::reservation::{PointsRedeemer, ReservationError};
use crate::shipping::ShippingState;

pub use events::CheckoutEvent;
pub use form::{CheckoutForm, FormError, ValidatedForm};

/// Where a checkout is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    /// The buyer can edit the form.
    #[default]
    Editing,
    /// Totals are being computed and the order created.
    Submitting,
    /// A pending order exists and the gateway is collecting payment.
    AwaitingPayment {
        order_id: OrderId,
        gateway_order_id: String,
    },
    /// A free order was accepted by the backend.
    Confirmed { order_id: OrderId },
    /// The order is paid (or free) and recorded.
    Finalized { order_id: OrderId },
    /// Payment failed or was cancelled.
    Failed {
        order_id: Option<OrderId>,
        reason: String,
    },
}

impl CheckoutState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Editing => "editing",
            Self::Submitting => "submitting",
            Self::AwaitingPayment { .. } => "awaiting_payment",
            Self::Confirmed { .. } => "confirmed",
            Self::Finalized { .. } => "finalized",
            Self::Failed { .. } => "failed",
        }
    }

    const fn can_move_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Editing, Self::Submitting)
                | (
                    Self::Submitting,
                    Self::Editing
                        | Self::AwaitingPayment { .. }
                        | Self::Confirmed { .. }
                        | Self::Failed { .. }
                )
                | (
                    Self::AwaitingPayment { .. },
                    Self::Finalized { .. } | Self::Failed { .. }
                )
                | (Self::Confirmed { .. }, Self::Finalized { .. })
                | (Self::Failed { .. }, Self::Editing)
        )
    }
}

/// What is being bought.
#[derive(Debug, Clone)]
pub enum CheckoutKind {
    EventTickets {
        event: Event,
        attendees: u32,
        buyer: Buyer,
    },
    Merchandise {
        club: ClubId,
        items: Vec<OrderLineItem>,
    },
}

impl CheckoutKind {
    #[must_use]
    pub const fn club(&self) -> &ClubId {
        match self {
            Self::EventTickets { event, .. } => &event.club_id,
            Self::Merchandise { club, .. } => club,
        }
    }

    #[must_use]
    pub const fn requires_shipping(&self) -> bool {
        matches!(self, Self::Merchandise { .. })
    }

    /// Subtotal before coupon and points, with ticket discounts evaluated at
    /// `now`.
    ///
    /// # Errors
    ///
    /// Returns a pricing error for zero attendees, an empty cart, mixed
    /// currencies or an amount out of range.
    pub fn subtotal(&self, now: DateTime<Utc>) -> Result<(Decimal, CurrencyCode), PricingError> {
        match self {
            Self::EventTickets {
                event,
                attendees,
                buyer,
            } => {
                let quote = event.pricing.quote(*buyer, *attendees, now)?;
                Ok((quote.subtotal, quote.currency))
            }
            Self::Merchandise { items, .. } => merchandise_subtotal(items),
        }
    }

    fn description(&self) -> String {
        match self {
            Self::EventTickets {
                event, attendees, ..
            } => format!("{} x {attendees}", event.title),
            Self::Merchandise { items, .. } => {
                let count = items
                    .iter()
                    .fold(0u32, |count, item| count.saturating_add(item.quantity));
                format!("Merchandise ({count} items)")
            }
        }
    }
}

/// Errors from running a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid checkout form: {0}")]
    Form(#[from] FormError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Points(#[from] ReservationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("backend did not open a gateway order for {0}")]
    MissingGatewayOrder(OrderId),

    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("payment cancelled")]
    PaymentCancelled,

    #[error("payment signature was rejected")]
    SignatureRejected,

    #[error("cannot move checkout from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl Categorized for CheckoutError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Form(_) | Self::Pricing(_) | Self::InvalidTransition { .. } => {
                ErrorCategory::Validation
            }
            Self::Coupon(e) => e.category(),
            Self::Points(e) => e.category(),
            Self::Api(e) => e.category(),
            Self::MissingGatewayOrder(_)
            | Self::PaymentFailed(_)
            | Self::PaymentCancelled
            | Self::SignatureRejected => ErrorCategory::PaymentGateway,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Form(e) => e.user_message(),
            Self::Pricing(PricingError::NoAttendees) => {
                "Please add at least one attendee.".to_string()
            }
            Self::Pricing(PricingError::EmptyCart) => "Your cart is empty.".to_string(),
            Self::Pricing(PricingError::CurrencyMismatch { .. }) => {
                "Items in different currencies cannot be bought together.".to_string()
            }
            Self::Pricing(PricingError::Overflow) => {
                "This order total is too large to process.".to_string()
            }
            Self::Coupon(e) => e.user_message(),
            Self::Points(e) => e.user_message(),
            Self::Api(e) => e.user_message(),
            Self::PaymentFailed(_) | Self::MissingGatewayOrder(_) => {
                "Payment failed. You have not been charged; please try again.".to_string()
            }
            Self::PaymentCancelled => "Payment was cancelled.".to_string(),
            Self::SignatureRejected => {
                "We could not verify your payment. Please contact support.".to_string()
            }
            Self::InvalidTransition { .. } => {
                "This checkout cannot be submitted right now.".to_string()
            }
        }
    }
}

/// A completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    /// Amount charged; zero for the free path.
    pub amount: Decimal,
    pub currency: CurrencyCode,
    /// Gateway payment id, absent for the free path.
    pub payment_id: Option<String>,
}

/// Priced amounts for one submission.
struct Pricing {
    totals: OrderTotals,
    payable: Payable,
    currency: CurrencyCode,
    /// Gateway charge in minor units; zero on the free path.
    amount_minor: u64,
}

impl Pricing {
    fn amounts(&self) -> OrderAmounts {
        let fees = match self.payable {
            Payable::Paid(fees) => fees,
            Payable::Free => FeeBreakdown {
                net: Decimal::ZERO,
                platform_fee: Decimal::ZERO,
                platform_fee_gst: Decimal::ZERO,
                gateway_fee: Decimal::ZERO,
                gateway_fee_gst: Decimal::ZERO,
                final_amount: Decimal::ZERO,
            },
        };
        OrderAmounts {
            subtotal: self.totals.subtotal,
            coupon_discount: self.totals.coupon_discount,
            points_discount: self.totals.points_discount,
            shipping: self.totals.shipping,
            tax: self.totals.tax,
            platform_fee: fees.platform_fee,
            platform_fee_gst: fees.platform_fee_gst,
            gateway_fee: fees.gateway_fee,
            gateway_fee_gst: fees.gateway_fee_gst,
            final_amount: fees.final_amount,
            currency: self.currency,
        }
    }
}

/// One checkout session.
pub struct Checkout {
    kind: CheckoutKind,
    /// Buyer details; edit freely while [`Checkout::state`] is `Editing`.
    pub form: CheckoutForm,
    coupon: CouponSlot,
    points: PointsRedeemer,
    shipping: Option<watch::Receiver<ShippingState>>,
    fees: FeeSchedule,
    /// Instant ticket discounts are evaluated at, fixed for the whole checkout
    /// so a coupon validated against the subtotal stays consistent with it.
    priced_at: DateTime<Utc>,
    gateway_key_id: Option<String>,
    state: CheckoutState,
    events: mpsc::UnboundedSender<CheckoutEvent>,
}

impl Checkout {
    /// Start a checkout. Returns the checkout and its event stream.
    #[must_use]
    pub fn new(
        kind: CheckoutKind,
        fees: FeeSchedule,
    ) -> (Self, mpsc::UnboundedReceiver<CheckoutEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let form = CheckoutForm {
            shipping_required: kind.requires_shipping(),
            ..CheckoutForm::default()
        };
        let checkout = Self {
            kind,
            form,
            coupon: CouponSlot::new(),
            points: PointsRedeemer::new(),
            shipping: None,
            fees,
            priced_at: Utc::now(),
            gateway_key_id: None,
            state: CheckoutState::Editing,
            events,
        };
        (checkout, rx)
    }

    /// Evaluate ticket discounts at `now` instead of the moment the checkout
    /// was opened.
    #[must_use]
    pub const fn with_pricing_time(mut self, now: DateTime<Utc>) -> Self {
        self.priced_at = now;
        self
    }

    /// Public gateway key passed to the payment gateway.
    #[must_use]
    pub fn with_gateway_key(mut self, key_id: Option<String>) -> Self {
        self.gateway_key_id = key_id;
        self
    }

    /// Follow a shipping lookup's state.
    #[must_use]
    pub fn with_shipping(mut self, shipping: watch::Receiver<ShippingState>) -> Self {
        self.shipping = Some(shipping);
        self
    }

    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    #[must_use]
    pub const fn kind(&self) -> &CheckoutKind {
        &self.kind
    }

    #[must_use]
    pub const fn coupon(&self) -> &CouponSlot {
        &self.coupon
    }

    #[must_use]
    pub const fn points(&self) -> &PointsRedeemer {
        &self.points
    }

    /// The latest shipping state; `Idle` when no lookup is attached.
    #[must_use]
    pub fn shipping_state(&self) -> ShippingState {
        self.shipping
            .as_ref()
            .map(|rx| rx.borrow().clone())
            .unwrap_or_default()
    }

    /// Subtotal before coupon and points.
    ///
    /// # Errors
    ///
    /// Returns a pricing error for an invalid selection.
    pub fn subtotal(&self) -> Result<(Decimal, CurrencyCode), PricingError> {
        self.kind.subtotal(self.priced_at)
    }

    /// Totals as they would be submitted right now.
    ///
    /// # Errors
    ///
    /// Returns a pricing error for an invalid selection.
    pub fn totals(&self) -> Result<OrderTotals, PricingError> {
        Ok(self.price()?.totals)
    }

    /// Validate the form without submitting.
    ///
    /// # Errors
    ///
    /// Returns the first form problem.
    pub fn validate(&self) -> Result<ValidatedForm, FormError> {
        self.form.validate(&self.shipping_state())
    }

    // =========================================================================
    // Discounts
    // =========================================================================

    /// Validate and apply a coupon against the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns the rejection; the checkout stays editable.
    pub async fn apply_coupon(&mut self, api: &ApiClient, code: &str) -> Result<(), CheckoutError> {
        self.ensure_editing("editing")?;
        let (subtotal, _) = self.subtotal()?;
        let club = self.kind.club().clone();

        match self.coupon.apply(api, code, &club, subtotal).await {
            Ok(coupon) => {
                let message = format!("Coupon {} applied: {} off", coupon.code, coupon.discount);
                self.notify(Notice::success(message));
                Ok(())
            }
            Err(e) => {
                self.notify(report(&e));
                Err(e.into())
            }
        }
    }

    /// Remove the applied coupon.
    pub fn remove_coupon(&mut self) {
        self.coupon.clear();
    }

    /// Hold loyalty points against this checkout.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid amount, or the backend error.
    pub async fn redeem_points(&mut self, api: &ApiClient, points: u64) -> Result<(), CheckoutError> {
        self.ensure_editing("editing")?;
        let club = self.kind.club().clone();

        match self.points.reserve(api, points, &club).await {
            Ok(reservation) => {
                let message = format!(
                    "{points} points applied: {} off",
                    reservation.discount_amount
                );
                self.notify(Notice::success(message));
                Ok(())
            }
            Err(e) => {
                self.notify(report(&e));
                Err(e.into())
            }
        }
    }

    /// Release held points and zero the redeem input.
    pub async fn clear_points(&mut self, api: &ApiClient) {
        self.points.cancel(api).await;
    }

    /// Go back to `Editing` after a failed payment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the checkout has failed.
    pub fn reset(&mut self) -> Result<(), CheckoutError> {
        if matches!(self.state, CheckoutState::Failed { .. }) {
            self.transition(CheckoutState::Editing)
        } else {
            Err(CheckoutError::InvalidTransition {
                from: self.state.name(),
                to: CheckoutState::Editing.name(),
            })
        }
    }

    /// Close the checkout without completing it: release any points hold and
    /// drop the coupon.
    pub async fn close(mut self, api: &ApiClient) {
        if !matches!(self.state, CheckoutState::Finalized { .. }) {
            self.points.cancel(api).await;
        }
        self.coupon.clear();
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit the checkout.
    ///
    /// A zero payable amount goes through the free path and never reaches
    /// `gateway`. Otherwise a pending order is created and `gateway` collects
    /// the payment.
    ///
    /// # Errors
    ///
    /// Validation and pre-order network errors leave the checkout in
    /// `Editing`. Payment failures leave it in `Failed`.
    #[instrument(skip_all, fields(club_id = %self.kind.club()))]
    pub async fn submit<G: PaymentGateway>(
        &mut self,
        api: &ApiClient,
        gateway: &G,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        self.ensure_editing(CheckoutState::Submitting.name())?;

        let form = match self.validate() {
            Ok(form) => form,
            Err(e) => return Err(self.fail_validation(e.into())),
        };
        let pricing = match self.price() {
            Ok(pricing) => pricing,
            Err(e) => return Err(self.fail_validation(e.into())),
        };

        self.transition(CheckoutState::Submitting)?;
        add_breadcrumb(
            "checkout",
            "Submitting checkout",
            &[("kind", if self.kind.requires_shipping() { "merchandise" } else { "event" })],
        );
        self.emit(CheckoutEvent::Priced {
            totals: pricing.totals,
            fees: match pricing.payable {
                Payable::Paid(fees) => Some(fees),
                Payable::Free => None,
            },
        });

        match pricing.payable {
            Payable::Free => self.submit_free(api, &form, &pricing).await,
            Payable::Paid(fees) => self.submit_paid(api, gateway, &form, &pricing, fees).await,
        }
    }

    async fn submit_free(
        &mut self,
        api: &ApiClient,
        form: &ValidatedForm,
        pricing: &Pricing,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let order = match self.create_order(api, form, pricing, PaymentStatus::Paid).await {
            Ok(order) => order,
            Err(e) => return Err(self.back_to_editing(e)),
        };

        tracing::info!(order_id = %order.order_id, "Free order confirmed");
        self.transition(CheckoutState::Confirmed {
            order_id: order.order_id.clone(),
        })?;
        self.points.confirm(api, &order.order_id).await;
        self.finalize(&order.order_id, "Registration confirmed!")?;

        Ok(CheckoutReceipt {
            order_id: order.order_id,
            amount: Decimal::ZERO,
            currency: pricing.currency,
            payment_id: None,
        })
    }

    async fn submit_paid<G: PaymentGateway>(
        &mut self,
        api: &ApiClient,
        gateway: &G,
        form: &ValidatedForm,
        pricing: &Pricing,
        fees: FeeBreakdown,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let order = match self.create_order(api, form, pricing, PaymentStatus::Pending).await {
            Ok(order) => order,
            Err(e) => return Err(self.back_to_editing(e)),
        };

        let Some(gateway_order_id) = order.gateway_order_id.clone() else {
            let err = CheckoutError::MissingGatewayOrder(order.order_id.clone());
            self.abandon_payment(api, &order.order_id, None, &err.to_string())
                .await;
            return Err(self.fail(Some(order.order_id), err));
        };

        self.transition(CheckoutState::AwaitingPayment {
            order_id: order.order_id.clone(),
            gateway_order_id: gateway_order_id.clone(),
        })?;

        let gateway_order = GatewayOrder {
            order_id: order.order_id.clone(),
            gateway_order_id: gateway_order_id.clone(),
            amount_minor: pricing.amount_minor,
            currency: pricing.currency,
            key_id: self.gateway_key_id.clone(),
            description: self.kind.description(),
            prefill: Prefill {
                name: form.contact.name.clone(),
                email: form.contact.email.to_string(),
                contact: form.contact.phone.clone(),
            },
        };
        add_breadcrumb(
            "checkout",
            "Opening payment gateway",
            &[("gateway_order_id", gateway_order_id.as_str())],
        );

        match gateway.collect(&gateway_order).await {
            PaymentOutcome::Succeeded(payment) => {
                self.complete_payment(api, &order, &payment, fees.final_amount, pricing.currency)
                    .await
            }
            PaymentOutcome::Failed { reason } => {
                self.abandon_payment(api, &order.order_id, Some(gateway_order_id), &reason)
                    .await;
                Err(self.fail(Some(order.order_id), CheckoutError::PaymentFailed(reason)))
            }
            PaymentOutcome::Cancelled => {
                self.abandon_payment(api, &order.order_id, Some(gateway_order_id), "cancelled")
                    .await;
                Err(self.fail(Some(order.order_id), CheckoutError::PaymentCancelled))
            }
        }
    }

    async fn complete_payment(
        &mut self,
        api: &ApiClient,
        order: &CreatedOrder,
        payment: &SignedPayment,
        amount: Decimal,
        currency: CurrencyCode,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        // Once the gateway has taken the money, network failures must not
        // release the points hold; the backend reconciles from the webhook.
        let verification = match api.verify_payment(&order.order_id, payment).await {
            Ok(v) => v,
            Err(e) => return Err(self.fail(Some(order.order_id.clone()), e.into())),
        };

        if !verification.verified {
            tracing::warn!(
                order_id = %order.order_id,
                payment_id = %payment.payment_id,
                "Payment signature rejected"
            );
            self.abandon_payment(
                api,
                &order.order_id,
                Some(payment.gateway_order_id.clone()),
                "signature rejected",
            )
            .await;
            return Err(self.fail(Some(order.order_id.clone()), CheckoutError::SignatureRejected));
        }

        if let Err(e) = api
            .update_payment_status(&order.order_id, &PaymentStatusUpdate::paid(payment))
            .await
        {
            return Err(self.fail(Some(order.order_id.clone()), e.into()));
        }

        tracing::info!(
            order_id = %order.order_id,
            payment_id = %payment.payment_id,
            "Payment captured"
        );
        self.points.confirm(api, &order.order_id).await;
        self.finalize(&order.order_id, "Payment successful!")?;

        Ok(CheckoutReceipt {
            order_id: order.order_id.clone(),
            amount,
            currency,
            payment_id: Some(payment.payment_id.clone()),
        })
    }

    /// Mark the order failed and release the points hold. Errors are logged.
    async fn abandon_payment(
        &mut self,
        api: &ApiClient,
        order_id: &OrderId,
        gateway_order_id: Option<String>,
        reason: &str,
    ) {
        let update = PaymentStatusUpdate::failed(gateway_order_id, reason);
        if let Err(e) = api.update_payment_status(order_id, &update).await {
            tracing::warn!(order_id = %order_id, error = %e, "Failed to record payment failure");
        }
        self.points.cancel(api).await;
    }

    async fn create_order(
        &self,
        api: &ApiClient,
        form: &ValidatedForm,
        pricing: &Pricing,
        payment_status: PaymentStatus,
    ) -> Result<CreatedOrder, ApiError> {
        let receipt = format!("rcpt_{}", uuid::Uuid::new_v4().simple());
        let coupon_code = self.coupon.code().map(str::to_owned);
        let points_reservation_token = self.points.token().map(str::to_owned);

        match &self.kind {
            CheckoutKind::EventTickets {
                event, attendees, ..
            } => {
                let request = EventOrderRequest {
                    attendees: *attendees,
                    contact: form.contact.clone(),
                    coupon_code,
                    points_reservation_token,
                    amounts: pricing.amounts(),
                    payment_status,
                    receipt,
                };
                if payment_status == PaymentStatus::Paid {
                    api.register_free(&event.id, &request).await
                } else {
                    api.create_event_order(&event.id, &request).await
                }
            }
            CheckoutKind::Merchandise { club, items } => {
                let Some(shipping_address) = form.address.clone() else {
                    return Err(ApiError::Api {
                        status: 400,
                        message: "A delivery address is required.".to_string(),
                    });
                };
                let request = MerchandiseOrderRequest {
                    club_id: club.clone(),
                    items: items.clone(),
                    contact: form.contact.clone(),
                    shipping_address,
                    courier_company_id: self
                        .shipping_state()
                        .rate()
                        .map(|r| r.courier_company_id),
                    coupon_code,
                    points_reservation_token,
                    amounts: pricing.amounts(),
                    payment_status,
                    receipt,
                };
                api.create_merchandise_order(&request).await
            }
        }
    }

    // =========================================================================
    // State machine
    // =========================================================================

    fn price(&self) -> Result<Pricing, PricingError> {
        let (subtotal, currency) = self.subtotal()?;
        let shipping = if self.kind.requires_shipping() {
            self.shipping_state().charge()
        } else {
            Decimal::ZERO
        };
        let totals = OrderTotals::new(subtotal)
            .with_coupon(self.coupon.discount())
            .with_points(self.points.discount())
            .with_shipping(shipping);
        let payable = totals.settle(&self.fees);
        let amount_minor = Money::new(payable.amount(), currency)
            .to_minor_units()
            .ok_or(PricingError::Overflow)?;
        Ok(Pricing {
            totals,
            payable,
            currency,
            amount_minor,
        })
    }

    fn ensure_editing(&self, to: &'static str) -> Result<(), CheckoutError> {
        if self.state == CheckoutState::Editing {
            Ok(())
        } else {
            Err(CheckoutError::InvalidTransition {
                from: self.state.name(),
                to,
            })
        }
    }

    fn transition(&mut self, next: CheckoutState) -> Result<(), CheckoutError> {
        if !self.state.can_move_to(&next) {
            return Err(CheckoutError::InvalidTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }
        tracing::debug!(from = self.state.name(), to = next.name(), "Checkout transition");
        let from = std::mem::replace(&mut self.state, next.clone());
        self.emit(CheckoutEvent::StateChanged { from, to: next });
        Ok(())
    }

    fn finalize(&mut self, order_id: &OrderId, message: &str) -> Result<(), CheckoutError> {
        self.transition(CheckoutState::Finalized {
            order_id: order_id.clone(),
        })?;
        self.coupon.clear();
        self.notify(Notice::success(message));
        Ok(())
    }

    /// Report a problem found before submitting; the state stays `Editing`.
    fn fail_validation(&self, err: CheckoutError) -> CheckoutError {
        self.notify(report(&err));
        err
    }

    /// Report a failure before an order exists and return to `Editing`.
    fn back_to_editing(&mut self, err: ApiError) -> CheckoutError {
        let err = CheckoutError::from(err);
        self.notify(report(&err));
        if let Err(e) = self.transition(CheckoutState::Editing) {
            tracing::error!(error = %e, "Checkout could not return to editing");
        }
        err
    }

    /// Report a payment-stage failure and move to `Failed`.
    fn fail(&mut self, order_id: Option<OrderId>, err: CheckoutError) -> CheckoutError {
        self.notify(report(&err));
        let next = CheckoutState::Failed {
            order_id,
            reason: err.to_string(),
        };
        if let Err(e) = self.transition(next) {
            tracing::error!(error = %e, "Checkout could not move to failed");
        }
        err
    }

    fn notify(&self, notice: Notice) {
        self.emit(CheckoutEvent::Notice(notice));
    }

    fn emit(&self, event: CheckoutEvent) {
        // A dropped receiver only means nobody is listening
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::AuthContext;
    use chrono::Duration;
    use clubhouse_core::{ClubId, DiscountValue, EarlyBirdRule, EventId, ProductId, TicketPricing};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingGateway {
        calls: AtomicUsize,
    }

    impl PaymentGateway for CountingGateway {
        async fn collect(&self, _order: &GatewayOrder) -> PaymentOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            PaymentOutcome::Cancelled
        }
    }

    fn offline_api() -> ApiClient {
        let config = ClientConfig::for_api("http://127.0.0.1:1/").unwrap();
        ApiClient::new(&config, AuthContext::in_memory()).unwrap()
    }

    fn event(price: Decimal) -> Event {
        Event {
            id: EventId::new("evt-1"),
            club_id: ClubId::new("club-1"),
            title: "Derby screening".to_string(),
            starts_at: Utc::now(),
            venue: None,
            pricing: TicketPricing {
                ticket_price: price,
                currency: CurrencyCode::INR,
                early_bird: None,
                member_discount: None,
                group_discount: None,
            },
            registration_open: true,
        }
    }

    fn ticket_checkout(price: Decimal) -> (Checkout, mpsc::UnboundedReceiver<CheckoutEvent>) {
        let (mut checkout, rx) = Checkout::new(
            CheckoutKind::EventTickets {
                event: event(price),
                attendees: 2,
                buyer: Buyer::guest(),
            },
            FeeSchedule::default(),
        );
        checkout.form = CheckoutForm {
            name: "Asha Rao".to_string(),
            email: "asha@example.in".to_string(),
            phone: "9876543210".to_string(),
            address: None,
            shipping_required: false,
        };
        (checkout, rx)
    }

    #[test]
    fn test_transition_table() {
        let order_id = OrderId::new("ord-1");
        let editing = CheckoutState::Editing;
        let submitting = CheckoutState::Submitting;
        let awaiting = CheckoutState::AwaitingPayment {
            order_id: order_id.clone(),
            gateway_order_id: "order_X".to_string(),
        };
        let finalized = CheckoutState::Finalized {
            order_id: order_id.clone(),
        };
        let failed = CheckoutState::Failed {
            order_id: Some(order_id),
            reason: "declined".to_string(),
        };

        assert!(editing.can_move_to(&submitting));
        assert!(submitting.can_move_to(&awaiting));
        assert!(awaiting.can_move_to(&finalized));
        assert!(awaiting.can_move_to(&failed));
        assert!(failed.can_move_to(&editing));

        assert!(!editing.can_move_to(&finalized));
        assert!(!finalized.can_move_to(&editing));
        assert!(!editing.can_move_to(&awaiting));
        assert!(!failed.can_move_to(&finalized));
    }

    #[tokio::test]
    async fn test_invalid_form_stays_editing_and_skips_gateway() {
        let (mut checkout, mut rx) = ticket_checkout(dec!(500));
        checkout.form.email = "not-an-email".to_string();
        let gateway = CountingGateway::default();

        let err = checkout.submit(&offline_api(), &gateway).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Form(FormError::InvalidEmail)));
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(checkout.state(), &CheckoutState::Editing);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);

        match rx.try_recv().unwrap() {
            CheckoutEvent::Notice(notice) => {
                assert_eq!(notice.kind, crate::NoticeKind::Error(ErrorCategory::Validation));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_network_failure_before_order_returns_to_editing() {
        let (mut checkout, mut rx) = ticket_checkout(dec!(500));
        let gateway = CountingGateway::default();

        let err = checkout.submit(&offline_api(), &gateway).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Api(_)));
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(checkout.state(), &CheckoutState::Editing);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);

        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let CheckoutEvent::StateChanged { to, .. } = event {
                states.push(to);
            }
        }
        assert_eq!(states, vec![CheckoutState::Submitting, CheckoutState::Editing]);
    }

    #[test]
    fn test_totals_include_shipping_only_for_merchandise() {
        let (checkout, _rx) = ticket_checkout(dec!(500));
        assert_eq!(checkout.totals().unwrap().subtotal, dec!(1000));
        assert_eq!(checkout.totals().unwrap().shipping, Decimal::ZERO);

        let items = vec![OrderLineItem {
            product_id: ProductId::new("jersey"),
            unit_price: dec!(999),
            quantity: 2,
            currency: CurrencyCode::INR,
            club_id: ClubId::new("club-1"),
        }];
        let (checkout, _rx) = Checkout::new(
            CheckoutKind::Merchandise {
                club: ClubId::new("club-1"),
                items,
            },
            FeeSchedule::default(),
        );
        assert!(checkout.form.shipping_required);
        let totals = checkout.totals().unwrap();
        assert_eq!(totals.subtotal, dec!(1998));
        // No lookup attached, so nothing quoted yet
        assert_eq!(totals.shipping, Decimal::ZERO);
    }

    #[test]
    fn test_pricing_time_is_fixed_for_the_checkout() {
        let window_end = Utc::now() - Duration::days(1);
        let mut event = event(dec!(1000));
        event.pricing.early_bird = Some(EarlyBirdRule {
            value: DiscountValue::Percentage(dec!(20)),
            starts_at: window_end - Duration::days(30),
            ends_at: window_end,
            members_only: false,
        });
        let kind = CheckoutKind::EventTickets {
            event,
            attendees: 1,
            buyer: Buyer::guest(),
        };

        // Opened while the early-bird window was still running
        let (checkout, _rx) = Checkout::new(kind.clone(), FeeSchedule::default());
        let checkout = checkout.with_pricing_time(window_end);
        assert_eq!(checkout.subtotal().unwrap().0, dec!(800));
        assert_eq!(checkout.totals().unwrap().subtotal, dec!(800));

        let (late, _rx) = Checkout::new(kind, FeeSchedule::default());
        assert_eq!(late.subtotal().unwrap().0, dec!(1000));
    }

    #[tokio::test]
    async fn test_uncollectable_amount_is_rejected_before_ordering() {
        let (mut checkout, _rx) = ticket_checkout(Decimal::from(u64::MAX));
        let gateway = CountingGateway::default();

        let err = checkout.submit(&offline_api(), &gateway).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Pricing(PricingError::Overflow)));
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(checkout.state(), &CheckoutState::Editing);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_description_counts_large_carts() {
        let line = OrderLineItem {
            product_id: ProductId::new("scarf"),
            unit_price: dec!(1),
            quantity: u32::MAX,
            currency: CurrencyCode::INR,
            club_id: ClubId::new("club-1"),
        };
        let kind = CheckoutKind::Merchandise {
            club: ClubId::new("club-1"),
            items: vec![line.clone(), line],
        };
        assert_eq!(kind.description(), format!("Merchandise ({} items)", u32::MAX));
    }

    #[test]
    fn test_reset_only_from_failed() {
        let (mut checkout, _rx) = ticket_checkout(dec!(500));
        assert!(matches!(
            checkout.reset(),
            Err(CheckoutError::InvalidTransition { from: "editing", .. })
        ));
    }
}
