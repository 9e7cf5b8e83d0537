//! Integration test support for Clubhouse.
//!
//! Spins up an in-process mock of the Clubhouse backend (under `/api/v1`) and
//! of the Shiprocket serviceability API on one ephemeral port, and records
//! every write the client makes so tests can assert on it.
//!
//! # Fixtures
//!
//! - Password `correct-horse` signs in with token `tok_test`; anything else is 401
//! - `club-1` has an active membership, `club-2` has none
//! - `evt-paid`: 1000 per ticket, 10% early bird (open now), 50 off for members
//! - `evt-cheap`: 200 per ticket, no discounts
//! - Coupon `MATCHDAY` takes a flat 200 off; every other code is rejected
//! - 1000 loyalty points available at 1 rupee each
//! - Payment signatures are checked with [`GATEWAY_SECRET`]
//! - Shiprocket token [`SHIPROCKET_TOKEN`]; PIN `744101` has only disabled
//!   couriers, `400002` answers 404, `110011` answers 500, `999999` hangs

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use clubhouse_client::api::{
    AccountSummary, Club, CreatedOrder, DeviceSession, Event, EventOrderRequest, Membership,
    MembershipPlan, MerchandiseItem, MerchandiseOrderRequest, PaymentStatusUpdate,
    PaymentVerification, PaymentVerificationRequest, PointsBalance,
};
use clubhouse_client::payment::razorpay;
use clubhouse_client::shipping::CourierRate;
use clubhouse_client::{GatewayOrder, PaymentGateway, PaymentOutcome, SignedPayment};
use clubhouse_core::{
    AppliedCoupon, ClubId, CurrencyCode, DiscountType, DiscountValue, EarlyBirdRule, EventId,
    MemberDiscountRule, MemberId, MembershipStatus, OrderId, PaymentStatus, PlanId,
    PointsReservation, ProductId, SessionId, TicketPricing, UserType,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Password the mock accepts.
pub const PASSWORD: &str = "correct-horse";
/// Bearer token issued on login.
pub const TOKEN: &str = "tok_test";
/// Key secret payment signatures are computed with.
pub const GATEWAY_SECRET: &str = "test_key_secret";
/// Bearer token the mock carrier API accepts.
pub const SHIPROCKET_TOKEN: &str = "sr_test";
/// Points available in every club.
pub const POINTS_AVAILABLE: u64 = 1000;

/// PIN code served only by disabled couriers.
pub const PIN_ALL_DISABLED: &str = "744101";
/// PIN code the carrier answers with 404.
pub const PIN_NOT_FOUND: &str = "400002";
/// PIN code the carrier answers with 500.
pub const PIN_SERVER_ERROR: &str = "110011";
/// PIN code the carrier never answers in time.
pub const PIN_SLOW: &str = "999999";

/// Everything the client sent that changes state.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub logins: Vec<String>,
    pub logouts: u32,
    pub event_orders: Vec<EventOrderRequest>,
    pub free_registrations: Vec<EventOrderRequest>,
    pub merchandise_orders: Vec<MerchandiseOrderRequest>,
    pub status_updates: Vec<(OrderId, PaymentStatusUpdate)>,
    pub reservations: Vec<u64>,
    pub confirmed_reservations: Vec<String>,
    pub cancelled_reservations: Vec<String>,
    pub coupon_checks: Vec<String>,
    pub courier_queries: Vec<HashMap<String, String>>,
}

#[derive(Default)]
struct MockState {
    recorded: Mutex<Recorded>,
    next_id: AtomicU32,
}

impl MockState {
    fn record(&self, f: impl FnOnce(&mut Recorded)) {
        f(&mut self.recorded.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

type Shared = Arc<MockState>;

/// A running mock backend. The server stops when this is dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Shared::default();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(Arc::clone(&state));

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Base URL of the backend API.
    ///
    /// # Panics
    ///
    /// Never in practice; the address is always a valid URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn api_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/v1/", self.addr)).unwrap()
    }

    /// Base URL of the carrier API.
    ///
    /// # Panics
    ///
    /// Never in practice; the address is always a valid URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn shiprocket_url(&self) -> Url {
        Url::parse(&format!("http://{}/v1/external/", self.addr)).unwrap()
    }

    /// A snapshot of everything recorded so far.
    #[must_use]
    pub fn recorded(&self) -> Recorded {
        self.state
            .recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/sessions", get(list_sessions))
        .route("/auth/sessions/{id}", delete(revoke_session))
        .route("/clubs", get(list_clubs))
        .route("/clubs/{id}", get(get_club))
        .route("/clubs/{id}/membership-plans", get(list_plans))
        .route("/clubs/{id}/membership", get(my_membership))
        .route("/clubs/{id}/merchandise", get(list_merchandise))
        .route("/clubs/{id}/points", get(points_balance))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/orders", post(create_event_order))
        .route("/events/{id}/registrations/free", post(register_free))
        .route("/merchandise/orders", post(create_merchandise_order))
        .route("/coupons/validate", post(validate_coupon))
        .route("/points/reservations", post(reserve_points))
        .route("/points/reservations/{token}", delete(cancel_reservation))
        .route("/points/reservations/{token}/confirm", post(confirm_reservation))
        .route("/orders/{id}/payment-status", patch(update_payment_status))
        .route("/payments/verify", post(verify_payment));

    Router::new()
        .nest("/api/v1", api)
        .route("/v1/external/courier/serviceability/", get(serviceability))
        .with_state(state)
}

// =============================================================================
// Helpers
// =============================================================================

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        == Some(token)
}

fn club(id: &str) -> Option<Club> {
    let (name, city) = match id {
        "club-1" => ("Northside Ultras", "Kolkata"),
        "club-2" => ("Harbour Supporters", "Mumbai"),
        _ => return None,
    };
    Some(Club {
        id: ClubId::new(id),
        name: name.to_string(),
        city: Some(city.to_string()),
        description: None,
        member_count: 120,
    })
}

/// Fixture events; the early-bird window is always open.
fn event(id: &str) -> Option<Event> {
    let now = Utc::now();
    let pricing = match id {
        "evt-paid" => TicketPricing {
            ticket_price: Decimal::from(1000),
            currency: CurrencyCode::INR,
            early_bird: Some(EarlyBirdRule {
                value: DiscountValue::Percentage(Decimal::from(10)),
                starts_at: now - chrono::Duration::days(1),
                ends_at: now + chrono::Duration::days(30),
                members_only: false,
            }),
            member_discount: Some(MemberDiscountRule {
                value: DiscountValue::Fixed(Decimal::from(50)),
            }),
            group_discount: None,
        },
        "evt-cheap" => TicketPricing {
            ticket_price: Decimal::from(200),
            currency: CurrencyCode::INR,
            early_bird: None,
            member_discount: None,
            group_discount: None,
        },
        _ => return None,
    };
    Some(Event {
        id: EventId::new(id),
        club_id: ClubId::new("club-1"),
        title: format!("Fixture {id}"),
        starts_at: now + chrono::Duration::days(45),
        venue: Some("Salt Lake Stadium".to_string()),
        pricing,
        registration_open: true,
    })
}

fn merchandise(club_id: &ClubId) -> Vec<MerchandiseItem> {
    [("scarf", "Home scarf", 499), ("jersey", "Away jersey", 1299)]
        .into_iter()
        .map(|(id, name, price)| MerchandiseItem {
            id: ProductId::new(id),
            club_id: club_id.clone(),
            name: name.to_string(),
            price: Decimal::from(price),
            currency: CurrencyCode::INR,
            stock: 25,
        })
        .collect()
}

fn created(
    order_id: OrderId,
    status: PaymentStatus,
    gateway: Option<String>,
    amount: Decimal,
) -> Response {
    Json(CreatedOrder {
        order_id,
        payment_status: status,
        gateway_order_id: gateway,
        amount,
        currency: CurrencyCode::INR,
    })
    .into_response()
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    email: String,
    password: String,
    user_type: UserType,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    if body.password != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }
    state.record(|r| r.logins.push(body.email.clone()));
    Json(json!({
        "token": TOKEN,
        "user": AccountSummary {
            id: MemberId::new("m-1"),
            name: "Test Member".to_string(),
            user_type: body.user_type,
        },
    }))
    .into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers, TOKEN) {
        return error(StatusCode::UNAUTHORIZED, "Session expired");
    }
    state.record(|r| r.logouts += 1);
    Json(json!({ "success": true })).into_response()
}

async fn list_sessions(headers: HeaderMap) -> Response {
    if !authorized(&headers, TOKEN) {
        return error(StatusCode::UNAUTHORIZED, "Session expired");
    }
    Json(vec![
        DeviceSession {
            id: SessionId::new("sess-1"),
            device_name: "integration-tests".to_string(),
            ip_address: Some("127.0.0.1".to_string()),
            last_active_at: Utc::now(),
            current: true,
        },
        DeviceSession {
            id: SessionId::new("sess-2"),
            device_name: "Pixel 8".to_string(),
            ip_address: None,
            last_active_at: Utc::now() - chrono::Duration::days(3),
            current: false,
        },
    ])
    .into_response()
}

async fn revoke_session(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers, TOKEN) {
        return error(StatusCode::UNAUTHORIZED, "Session expired");
    }
    if id == "sess-2" {
        Json(json!({ "success": true })).into_response()
    } else {
        error(StatusCode::NOT_FOUND, "Session not found")
    }
}

// =============================================================================
// Clubs & Events
// =============================================================================

async fn list_clubs() -> Json<Vec<Club>> {
    Json(["club-1", "club-2"].into_iter().filter_map(club).collect())
}

async fn get_club(Path(id): Path<String>) -> Response {
    club(&id).map_or_else(
        || error(StatusCode::NOT_FOUND, "Club not found"),
        |c| Json(c).into_response(),
    )
}

async fn list_plans(Path(id): Path<String>) -> Json<Vec<MembershipPlan>> {
    let club_id = ClubId::new(id);
    Json(vec![MembershipPlan {
        id: PlanId::new("plan-season"),
        club_id,
        name: "Season".to_string(),
        price: Decimal::from(999),
        currency: CurrencyCode::INR,
        duration_days: 365,
        limits: serde_json::Map::new(),
    }])
}

async fn my_membership(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers, TOKEN) {
        return error(StatusCode::UNAUTHORIZED, "Session expired");
    }
    if id != "club-1" {
        return error(StatusCode::NOT_FOUND, "Not a member");
    }
    Json(Membership {
        club_id: ClubId::new(id),
        plan_id: PlanId::new("plan-season"),
        status: MembershipStatus::Active,
        expires_at: Some(Utc::now() + chrono::Duration::days(200)),
    })
    .into_response()
}

async fn get_event(Path(id): Path<String>) -> Response {
    event(&id).map_or_else(
        || error(StatusCode::NOT_FOUND, "Event not found"),
        |e| Json(e).into_response(),
    )
}

async fn create_event_order(
    State(state): State<Shared>,
    Path(_id): Path<String>,
    Json(body): Json<EventOrderRequest>,
) -> Response {
    let n = state.next_id();
    let amount = body.amounts.final_amount;
    state.record(|r| r.event_orders.push(body));
    created(
        OrderId::new(format!("ord-{n}")),
        PaymentStatus::Pending,
        Some(format!("order_{n}")),
        amount,
    )
}

async fn register_free(
    State(state): State<Shared>,
    Path(_id): Path<String>,
    Json(body): Json<EventOrderRequest>,
) -> Response {
    if body.amounts.final_amount > Decimal::ZERO {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "This event is not free");
    }
    let n = state.next_id();
    state.record(|r| r.free_registrations.push(body));
    created(OrderId::new(format!("ord-{n}")), PaymentStatus::Paid, None, Decimal::ZERO)
}

// =============================================================================
// Merchandise & Coupons
// =============================================================================

async fn list_merchandise(Path(id): Path<String>) -> Json<Vec<MerchandiseItem>> {
    Json(merchandise(&ClubId::new(id)))
}

async fn create_merchandise_order(
    State(state): State<Shared>,
    Json(body): Json<MerchandiseOrderRequest>,
) -> Response {
    let n = state.next_id();
    let amount = body.amounts.final_amount;
    let status = body.payment_status;
    state.record(|r| r.merchandise_orders.push(body));
    let gateway = (status == PaymentStatus::Pending).then(|| format!("order_{n}"));
    created(OrderId::new(format!("ord-{n}")), status, gateway, amount)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CouponBody {
    code: String,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

async fn validate_coupon(State(state): State<Shared>, Json(body): Json<CouponBody>) -> Response {
    state.record(|r| r.coupon_checks.push(body.code.clone()));
    if body.code != "MATCHDAY" {
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("Coupon {} is not valid", body.code),
        );
    }
    let discount = Decimal::from(200).min(body.amount);
    Json(AppliedCoupon {
        code: body.code,
        name: "Matchday special".to_string(),
        discount_type: DiscountType::Flat,
        discount_value: Decimal::from(200),
        discount,
        original_price: body.amount,
        final_price: body.amount - discount,
    })
    .into_response()
}

// =============================================================================
// Points
// =============================================================================

async fn points_balance() -> Json<PointsBalance> {
    Json(PointsBalance {
        available: POINTS_AVAILABLE,
        point_value: Some(Decimal::ONE),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReserveBody {
    points: u64,
}

async fn reserve_points(State(state): State<Shared>, Json(body): Json<ReserveBody>) -> Response {
    if body.points > POINTS_AVAILABLE {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Insufficient points");
    }
    let n = state.next_id();
    state.record(|r| r.reservations.push(body.points));
    Json(PointsReservation {
        reservation_token: format!("rsv-{n}"),
        discount_amount: Decimal::from(body.points),
        club_id: None,
    })
    .into_response()
}

async fn confirm_reservation(State(state): State<Shared>, Path(token): Path<String>) -> Response {
    state.record(|r| r.confirmed_reservations.push(token));
    Json(json!({ "success": true })).into_response()
}

async fn cancel_reservation(State(state): State<Shared>, Path(token): Path<String>) -> Response {
    state.record(|r| r.cancelled_reservations.push(token));
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// Payments
// =============================================================================

async fn update_payment_status(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<PaymentStatusUpdate>,
) -> Response {
    state.record(|r| r.status_updates.push((OrderId::new(id), body)));
    Json(json!({ "success": true })).into_response()
}

async fn verify_payment(Json(body): Json<PaymentVerificationRequest>) -> Json<PaymentVerification> {
    let payment = SignedPayment {
        gateway_order_id: body.gateway_order_id,
        payment_id: body.payment_id,
        signature: body.signature,
    };
    Json(PaymentVerification {
        verified: razorpay::verify(&SecretString::from(GATEWAY_SECRET), &payment),
    })
}

// =============================================================================
// Carrier
// =============================================================================

fn courier(
    id: u64,
    name: &str,
    rate: i64,
    disabled: bool,
    days: serde_json::Value,
) -> serde_json::Value {
    json!({
        "courier_company_id": id,
        "courier_name": name,
        "rate": rate,
        "courier_disabled": disabled,
        "estimated_delivery_days": days,
    })
}

async fn serviceability(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers, SHIPROCKET_TOKEN) {
        return error(StatusCode::UNAUTHORIZED, "Token is invalid");
    }
    let delivery = query.get("delivery_postcode").cloned().unwrap_or_default();
    state.record(|r| r.courier_queries.push(query));

    let couriers = match delivery.as_str() {
        PIN_NOT_FOUND => return error(StatusCode::NOT_FOUND, "No courier serviceable"),
        PIN_SERVER_ERROR => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
        }
        PIN_SLOW => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Vec::new()
        }
        PIN_ALL_DISABLED => vec![
            courier(1, "Delhivery Surface", 120, true, json!(6)),
            courier(2, "Xpressbees", 85, true, json!("5")),
        ],
        _ => vec![
            courier(1, "Delhivery Surface", 120, false, json!(6)),
            courier(2, "Xpressbees", 85, false, json!("5")),
            courier(3, "Blue Dart", 60, true, json!(2)),
        ],
    };

    Json(json!({
        "status": 200,
        "data": { "available_courier_companies": couriers },
    }))
    .into_response()
}

// =============================================================================
// Payment gateway double
// =============================================================================

/// What a [`ScriptedGateway`] does when asked to collect.
#[derive(Debug, Clone)]
pub enum Script {
    /// Succeed with a correctly signed callback.
    Approve,
    /// Succeed with a callback whose signature does not match.
    Forge,
    /// Report a declined payment.
    Decline(String),
    /// The buyer closes the gateway.
    Cancel,
}

/// A [`PaymentGateway`] that follows a fixed script and remembers every
/// order it was handed.
pub struct ScriptedGateway {
    script: Script,
    orders: Mutex<Vec<GatewayOrder>>,
}

impl ScriptedGateway {
    #[must_use]
    pub const fn new(script: Script) -> Self {
        Self {
            script,
            orders: Mutex::new(Vec::new()),
        }
    }

    /// Orders the gateway was asked to collect, in order.
    #[must_use]
    pub fn orders(&self) -> Vec<GatewayOrder> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PaymentGateway for ScriptedGateway {
    async fn collect(&self, order: &GatewayOrder) -> PaymentOutcome {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(order.clone());

        let payment_id = format!("pay_{}", uuid::Uuid::new_v4().simple());
        match &self.script {
            Script::Approve => {
                match razorpay::signature(
                    &SecretString::from(GATEWAY_SECRET),
                    &order.gateway_order_id,
                    &payment_id,
                ) {
                    Ok(signature) => PaymentOutcome::Succeeded(SignedPayment {
                        gateway_order_id: order.gateway_order_id.clone(),
                        payment_id,
                        signature,
                    }),
                    Err(e) => PaymentOutcome::Failed {
                        reason: e.to_string(),
                    },
                }
            }
            Script::Forge => PaymentOutcome::Succeeded(SignedPayment {
                gateway_order_id: order.gateway_order_id.clone(),
                payment_id,
                signature: "0".repeat(64),
            }),
            Script::Decline(reason) => PaymentOutcome::Failed {
                reason: reason.clone(),
            },
            Script::Cancel => PaymentOutcome::Cancelled,
        }
    }
}

/// Courier rate as the carrier fixture reports it, for assertions.
#[must_use]
pub fn fixture_rate(id: u64) -> Option<CourierRate> {
    let (name, rate, days) = match id {
        1 => ("Delhivery Surface", 120, 6),
        2 => ("Xpressbees", 85, 5),
        _ => return None,
    };
    Some(CourierRate {
        courier_company_id: id,
        courier_name: name.to_string(),
        rate: Decimal::from(rate),
        courier_disabled: false,
        estimated_delivery_days: Some(days),
    })
}
