//! Loyalty points balance and reservations.

use clubhouse_core::{ClubId, OrderId, PointsReservation};
use serde::de::IgnoredAny;
use tracing::instrument;

use super::types::{ConfirmReservationRequest, PointsBalance, ReservePointsRequest};
use super::{ApiClient, ApiError, segment};

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn points_balance(&self, club: &ClubId) -> Result<PointsBalance, ApiError> {
        self.get(&format!("clubs/{}/points", segment(club.as_str())?)).await
    }

    /// Hold `points` against a pending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the amount.
    #[instrument(skip(self), fields(club_id = %club))]
    pub async fn reserve_points(
        &self,
        points: u64,
        club: &ClubId,
    ) -> Result<PointsReservation, ApiError> {
        let mut reservation: PointsReservation = self
            .post(
                "points/reservations",
                &ReservePointsRequest {
                    points,
                    club_id: club,
                },
            )
            .await?;
        if reservation.club_id.is_none() {
            reservation.club_id = Some(club.clone());
        }
        Ok(reservation)
    }

    /// Convert a hold into a redemption once the order is paid.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(order_id = %order))]
    pub async fn confirm_reservation(&self, token: &str, order: &OrderId) -> Result<(), ApiError> {
        let path = format!("points/reservations/{}/confirm", segment(token)?);
        let _: IgnoredAny = self
            .post(&path, &ConfirmReservationRequest { order_id: order })
            .await?;
        Ok(())
    }

    /// Release a hold.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn cancel_reservation(&self, token: &str) -> Result<(), ApiError> {
        let _: IgnoredAny = self.delete(&format!("points/reservations/{}", segment(token)?)).await?;
        Ok(())
    }
}
