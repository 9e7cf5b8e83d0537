//! Event details and ticket orders.

use clubhouse_core::EventId;
use tracing::instrument;

use super::types::{CreatedOrder, Event, EventOrderRequest};
use super::{ApiClient, ApiError, segment};

impl ApiClient {
    /// An event with its ticket pricing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown event.
    pub async fn get_event(&self, event: &EventId) -> Result<Event, ApiError> {
        self.get(&format!("events/{}", segment(event.as_str())?)).await
    }

    /// Register for an event whose payable amount is zero.
    ///
    /// The backend records the registration as paid without a gateway order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, request), fields(event_id = %event, attendees = request.attendees))]
    pub async fn register_free(
        &self,
        event: &EventId,
        request: &EventOrderRequest,
    ) -> Result<CreatedOrder, ApiError> {
        let path = format!("events/{}/registrations/free", segment(event.as_str())?);
        self.post(&path, request).await
    }

    /// Create a pending ticket order and its gateway order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, request), fields(event_id = %event, attendees = request.attendees))]
    pub async fn create_event_order(
        &self,
        event: &EventId,
        request: &EventOrderRequest,
    ) -> Result<CreatedOrder, ApiError> {
        let path = format!("events/{}/orders", segment(event.as_str())?);
        self.post(&path, request).await
    }
}
