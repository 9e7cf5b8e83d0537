//! Merchandise and coupons.

use clubhouse_core::{AppliedCoupon, ClubId};
use rust_decimal::Decimal;
use tracing::instrument;

use super::types::{
    CreatedOrder, MerchandiseItem, MerchandiseOrderRequest, ValidateCouponRequest,
};
use super::{ApiClient, ApiError, segment};

impl ApiClient {
    /// Products a club sells.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_merchandise(&self, club: &ClubId) -> Result<Vec<MerchandiseItem>, ApiError> {
        self.get(&format!("clubs/{}/merchandise", segment(club.as_str())?)).await
    }

    /// Create a merchandise order. A zero `final_amount` creates an order
    /// that is already paid.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, request), fields(club_id = %request.club_id, items = request.items.len()))]
    pub async fn create_merchandise_order(
        &self,
        request: &MerchandiseOrderRequest,
    ) -> Result<CreatedOrder, ApiError> {
        self.post("merchandise/orders", request).await
    }

    /// Validate a coupon code against an order amount.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with a 4xx status when the backend rejects the
    /// code (unknown, expired, below minimum).
    #[instrument(skip(self), fields(club_id = %club))]
    pub async fn validate_coupon(
        &self,
        code: &str,
        club: &ClubId,
        amount: Decimal,
    ) -> Result<AppliedCoupon, ApiError> {
        self.post(
            "coupons/validate",
            &ValidateCouponRequest {
                code,
                club_id: club,
                amount,
            },
        )
        .await
    }
}
