//! Loyalty-point reservations.
//!
//! Points are held by the backend while an order is pending, converted into a
//! redemption once the payment succeeds, and released on failure or when the
//! user clears the input. The local state is zeroed on release whether or
//! not the backend call succeeds; the backend expires stale holds on its own.

use clubhouse_core::{ClubId, OrderId, PointsReservation};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use crate::api::{ApiClient, ApiError, PointsBalance};
use crate::error::{Categorized, ErrorCategory};

/// Errors from reserving points.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("no points to redeem")]
    NothingToRedeem,

    #[error("requested {requested} points but only {available} are available")]
    InsufficientPoints { requested: u64, available: u64 },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Categorized for ReservationError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::NothingToRedeem | Self::InsufficientPoints { .. } => ErrorCategory::Validation,
            Self::Api(e) => e.category(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::NothingToRedeem => "Enter the number of points to redeem.".to_string(),
            Self::InsufficientPoints { available, .. } => {
                format!("You only have {available} points available.")
            }
            Self::Api(e) => e.user_message(),
        }
    }
}

/// The redeem-points input together with the hold it produced.
#[derive(Debug, Clone, Default)]
pub struct PointsRedeemer {
    input: u64,
    balance: Option<PointsBalance>,
    reservation: Option<PointsReservation>,
}

impl PointsRedeemer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the user asked to redeem.
    #[must_use]
    pub const fn input(&self) -> u64 {
        self.input
    }

    /// Balance fetched by the last [`reserve`](Self::reserve).
    #[must_use]
    pub const fn balance(&self) -> Option<PointsBalance> {
        self.balance
    }

    #[must_use]
    pub const fn reservation(&self) -> Option<&PointsReservation> {
        self.reservation.as_ref()
    }

    /// The reservation token to send with the order.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.reservation
            .as_ref()
            .map(|r| r.reservation_token.as_str())
    }

    /// Discount granted by the current hold; zero when there is none.
    #[must_use]
    pub fn discount(&self) -> Decimal {
        self.reservation
            .as_ref()
            .map_or(Decimal::ZERO, |r| r.discount_amount)
    }

    /// Hold `points` for the current checkout.
    ///
    /// Any existing hold is released first.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero points or more points than the
    /// balance, or the backend error.
    #[instrument(skip(self, api), fields(club_id = %club))]
    pub async fn reserve(
        &mut self,
        api: &ApiClient,
        points: u64,
        club: &ClubId,
    ) -> Result<&PointsReservation, ReservationError> {
        if points == 0 {
            return Err(ReservationError::NothingToRedeem);
        }

        let balance = api.points_balance(club).await?;
        self.balance = Some(balance);
        if points > balance.available {
            return Err(ReservationError::InsufficientPoints {
                requested: points,
                available: balance.available,
            });
        }

        if self.reservation.is_some() {
            self.cancel(api).await;
        }

        let reservation = api.reserve_points(points, club).await?;
        tracing::info!(
            points,
            discount = %reservation.discount_amount,
            "Points reserved"
        );
        self.input = points;
        Ok(self.reservation.insert(reservation))
    }

    /// Turn the hold into a redemption for `order`.
    ///
    /// Only called after the payment succeeded. A failure is logged and
    /// otherwise ignored. Returns whether the backend acknowledged it.
    #[instrument(skip(self, api), fields(order_id = %order))]
    pub async fn confirm(&mut self, api: &ApiClient, order: &OrderId) -> bool {
        let Some(reservation) = self.reservation.take() else {
            return false;
        };
        self.input = 0;

        match api
            .confirm_reservation(&reservation.reservation_token, order)
            .await
        {
            Ok(()) => {
                tracing::info!("Points redemption confirmed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to confirm points redemption");
                false
            }
        }
    }

    /// Release the hold and zero the input and discount.
    ///
    /// Local state is cleared even if the backend call fails.
    #[instrument(skip(self, api))]
    pub async fn cancel(&mut self, api: &ApiClient) {
        self.input = 0;
        let Some(reservation) = self.reservation.take() else {
            return;
        };

        if let Err(e) = api
            .cancel_reservation(&reservation.reservation_token)
            .await
        {
            tracing::warn!(error = %e, "Failed to release points reservation");
        } else {
            tracing::debug!("Points reservation released");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::AuthContext;
    use rust_decimal_macros::dec;

    fn offline_api() -> ApiClient {
        let config = ClientConfig::for_api("http://127.0.0.1:1/").unwrap();
        ApiClient::new(&config, AuthContext::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn test_zero_points_rejected_without_network() {
        let mut redeemer = PointsRedeemer::new();
        let err = redeemer
            .reserve(&offline_api(), 0, &ClubId::new("club-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NothingToRedeem));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[tokio::test]
    async fn test_cancel_zeros_state_when_backend_unreachable() {
        let mut redeemer = PointsRedeemer {
            input: 300,
            balance: None,
            reservation: Some(PointsReservation {
                reservation_token: "rsv_1".to_string(),
                discount_amount: dec!(300),
                club_id: None,
            }),
        };
        assert_eq!(redeemer.discount(), dec!(300));

        redeemer.cancel(&offline_api()).await;
        assert_eq!(redeemer.input(), 0);
        assert_eq!(redeemer.discount(), Decimal::ZERO);
        assert!(redeemer.token().is_none());
    }

    #[tokio::test]
    async fn test_confirm_failure_is_swallowed() {
        let mut redeemer = PointsRedeemer {
            input: 100,
            balance: None,
            reservation: Some(PointsReservation {
                reservation_token: "rsv_2".to_string(),
                discount_amount: dec!(100),
                club_id: None,
            }),
        };
        let confirmed = redeemer
            .confirm(&offline_api(), &OrderId::new("ord-1"))
            .await;
        assert!(!confirmed);
        assert!(redeemer.reservation().is_none());
    }

    #[tokio::test]
    async fn test_confirm_without_reservation_is_noop() {
        let mut redeemer = PointsRedeemer::new();
        assert!(!redeemer.confirm(&offline_api(), &OrderId::new("ord-1")).await);
    }
}
