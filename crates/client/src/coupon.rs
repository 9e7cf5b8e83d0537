//! The coupon applied to the current checkout.
//!
//! Coupons are validated by the backend for a specific order amount; the
//! slot only remembers the accepted result so the checkout can subtract its
//! discount.

use clubhouse_core::{AppliedCoupon, ClubId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::error::{Categorized, ErrorCategory};

/// Errors from applying a coupon.
#[derive(Debug, Error)]
pub enum CouponError {
    #[error("coupon code is empty")]
    Blank,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Categorized for CouponError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Blank => ErrorCategory::Validation,
            // Unknown or expired codes come back as 4xx
            Self::Api(e) => e.category(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Blank => "Please enter a coupon code.".to_string(),
            Self::Api(ApiError::NotFound(_)) => "That coupon code is not valid.".to_string(),
            Self::Api(e) => e.user_message(),
        }
    }
}

/// Holds at most one applied coupon.
#[derive(Debug, Clone, Default)]
pub struct CouponSlot {
    applied: Option<AppliedCoupon>,
}

impl CouponSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self { applied: None }
    }

    /// Validate `code` against `amount` and keep the result.
    ///
    /// A rejected code leaves any previously applied coupon in place.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Blank` for an empty code, or the backend's
    /// rejection.
    pub async fn apply(
        &mut self,
        api: &ApiClient,
        code: &str,
        club: &ClubId,
        amount: Decimal,
    ) -> Result<&AppliedCoupon, CouponError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CouponError::Blank);
        }

        let coupon = api.validate_coupon(code, club, amount).await?;
        tracing::info!(
            code = %coupon.code,
            discount = %coupon.discount,
            "Coupon applied"
        );
        Ok(self.applied.insert(coupon))
    }

    /// Remove the applied coupon.
    pub fn clear(&mut self) {
        if let Some(coupon) = self.applied.take() {
            tracing::debug!(code = %coupon.code, "Coupon cleared");
        }
    }

    #[must_use]
    pub const fn applied(&self) -> Option<&AppliedCoupon> {
        self.applied.as_ref()
    }

    /// The code to send with the order, if a coupon is applied.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.applied.as_ref().map(|c| c.code.as_str())
    }

    /// The discount to subtract; zero when empty.
    #[must_use]
    pub fn discount(&self) -> Decimal {
        self.applied.as_ref().map_or(Decimal::ZERO, |c| c.discount)
    }
}
