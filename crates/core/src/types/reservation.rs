//! Loyalty point reservations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ClubId;

/// A temporary hold on a member's loyalty points.
///
/// Must be confirmed once payment succeeds or cancelled otherwise; an
/// abandoned reservation is released by the backend when it expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsReservation {
    pub reservation_token: String,
    pub discount_amount: Decimal,
    #[serde(default)]
    pub club_id: Option<ClubId>,
}
