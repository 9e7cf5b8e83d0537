//! Clubs and memberships.

use clubhouse_core::{ClubId, PlanId};
use serde::Serialize;
use tracing::instrument;

use super::types::{Club, Membership, MembershipPlan};
use super::{ApiClient, ApiError, segment};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterMembershipRequest<'a> {
    plan_id: &'a PlanId,
}

impl ApiClient {
    /// All clubs visible to the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_clubs(&self) -> Result<Vec<Club>, ApiError> {
        self.get("clubs").await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown club.
    pub async fn get_club(&self, club: &ClubId) -> Result<Club, ApiError> {
        self.get(&format!("clubs/{}", segment(club.as_str())?)).await
    }

    /// Membership tiers offered by a club.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_membership_plans(
        &self,
        club: &ClubId,
    ) -> Result<Vec<MembershipPlan>, ApiError> {
        self.get(&format!("clubs/{}/membership-plans", segment(club.as_str())?)).await
    }

    /// Join a club on the given plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the plan.
    #[instrument(skip(self), fields(club_id = %club, plan_id = %plan))]
    pub async fn register_membership(
        &self,
        club: &ClubId,
        plan: &PlanId,
    ) -> Result<Membership, ApiError> {
        self.post(
            &format!("clubs/{}/memberships", segment(club.as_str())?),
            &RegisterMembershipRequest { plan_id: plan },
        )
        .await
    }

    /// The current user's membership in `club`, or `None` if not a member.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn my_membership(&self, club: &ClubId) -> Result<Option<Membership>, ApiError> {
        match self.get(&format!("clubs/{}/membership", segment(club.as_str())?)).await {
            Ok(membership) => Ok(Some(membership)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
