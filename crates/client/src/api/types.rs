//! Wire types for the Clubhouse backend.
//!
//! Field names follow the backend's camelCase JSON. Amounts sent to the
//! backend are serialized as JSON numbers.

use chrono::{DateTime, Utc};
use clubhouse_core::{
    ClubId, CurrencyCode, Email, EventId, MemberId, MembershipStatus, OrderId, OrderLineItem,
    PaymentStatus, PlanId, ProductId, SessionId, TicketPricing, UserType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Auth & Sessions
// =============================================================================

/// Credentials for `POST auth/login`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub user_type: UserType,
    pub device_name: &'a str,
}

/// Response to a successful login.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    pub token: String,
    pub user: AccountSummary,
}

/// The signed-in account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: MemberId,
    pub name: String,
    pub user_type: UserType,
}

/// A device with an active session for the current account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSession {
    pub id: SessionId,
    pub device_name: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub last_active_at: DateTime<Utc>,
    /// Whether this is the session making the request.
    #[serde(default)]
    pub current: bool,
}

// =============================================================================
// Clubs & Memberships
// =============================================================================

/// A supporter group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: ClubId,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_count: u32,
}

/// A priced membership tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipPlan {
    pub id: PlanId,
    pub club_id: ClubId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub duration_days: u32,
    /// Feature limits keyed by feature name.
    #[serde(default)]
    pub limits: serde_json::Map<String, serde_json::Value>,
}

/// The current user's membership in a club.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub club_id: ClubId,
    pub plan_id: PlanId,
    pub status: MembershipStatus,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Events
// =============================================================================

/// A club event with paid (or free) registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub club_id: ClubId,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub venue: Option<String>,
    pub pricing: TicketPricing,
    #[serde(default = "registration_open_default")]
    pub registration_open: bool,
}

const fn registration_open_default() -> bool {
    true
}

// =============================================================================
// Merchandise
// =============================================================================

/// A product sold by a club.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchandiseItem {
    pub id: ProductId,
    pub club_id: ClubId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub stock: u32,
}

impl MerchandiseItem {
    /// A cart line for `quantity` of this product.
    #[must_use]
    pub fn line(&self, quantity: u32) -> OrderLineItem {
        OrderLineItem {
            product_id: self.id.clone(),
            unit_price: self.price,
            quantity,
            currency: self.currency,
            club_id: self.club_id.clone(),
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Buyer contact details collected by the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub name: String,
    pub email: Email,
    pub phone: String,
}

/// Where merchandise is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// The priced amounts submitted with an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAmounts {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub coupon_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub points_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub platform_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub platform_fee_gst: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gateway_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gateway_fee_gst: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_amount: Decimal,
    pub currency: CurrencyCode,
}

/// Body for `POST events/{id}/orders` and `POST events/{id}/registrations/free`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOrderRequest {
    pub attendees: u32,
    pub contact: ContactDetails,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub points_reservation_token: Option<String>,
    pub amounts: OrderAmounts,
    pub payment_status: PaymentStatus,
    /// Client-generated idempotency reference.
    pub receipt: String,
}

/// Body for `POST merchandise/orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchandiseOrderRequest {
    pub club_id: ClubId,
    pub items: Vec<OrderLineItem>,
    pub contact: ContactDetails,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub courier_company_id: Option<u64>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub points_reservation_token: Option<String>,
    pub amounts: OrderAmounts,
    pub payment_status: PaymentStatus,
    pub receipt: String,
}

/// An order the backend created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub payment_status: PaymentStatus,
    /// Present when the backend opened a gateway order for a paid checkout.
    #[serde(default)]
    pub gateway_order_id: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
}

// =============================================================================
// Coupons & Points
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValidateCouponRequest<'a> {
    pub code: &'a str,
    pub club_id: &'a ClubId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// A member's loyalty balance in a club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsBalance {
    pub available: u64,
    /// Rupee value of one point, when the backend reports it.
    #[serde(default)]
    pub point_value: Option<Decimal>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReservePointsRequest<'a> {
    pub points: u64,
    pub club_id: &'a ClubId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfirmReservationRequest<'a> {
    pub order_id: &'a OrderId,
}

// =============================================================================
// Payments
// =============================================================================

/// Body for `PATCH orders/{id}/payment-status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusUpdate {
    pub status: PaymentStatus,
    #[serde(default)]
    pub gateway_order_id: Option<String>,
    #[serde(default)]
    pub gateway_payment_id: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Body for `POST payments/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerificationRequest {
    pub order_id: OrderId,
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Result of `POST payments/verify`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub verified: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_amounts_serialize_as_numbers() {
        let amounts = OrderAmounts {
            subtotal: dec!(2550),
            final_amount: dec!(2435.85),
            ..OrderAmounts::default()
        };
        let json = serde_json::to_value(amounts).unwrap();
        assert_eq!(json["subtotal"], serde_json::json!(2550.0));
        assert_eq!(json["finalAmount"], serde_json::json!(2435.85));
        assert_eq!(json["currency"], serde_json::json!("INR"));
    }

    #[test]
    fn test_event_deserializes_with_defaults() {
        let json = r#"{
            "id": "evt-1",
            "clubId": "club-1",
            "title": "Derby watch party",
            "startsAt": "2026-04-12T18:30:00Z",
            "pricing": {"ticketPrice": 499}
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert!(event.registration_open);
        assert_eq!(event.pricing.ticket_price, dec!(499));
        assert!(event.pricing.early_bird.is_none());
    }
}
