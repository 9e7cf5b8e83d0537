//! Status enums shared with the backend.

use serde::{Deserialize, Serialize};

/// Payment status of an order as recorded by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Order created, payment not yet completed.
    #[default]
    Pending,
    /// Gateway confirmed the payment.
    Paid,
    /// Payment failed or was abandoned.
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Membership lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    #[default]
    Pending,
    Active,
    Expired,
    Cancelled,
}

impl MembershipStatus {
    /// Only active members receive member pricing.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// The kind of account a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// A supporter who joins clubs and buys tickets or merchandise.
    Member,
    /// A club administrator.
    Admin,
    /// The platform owner.
    SystemOwner,
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Member => write!(f, "member"),
            Self::Admin => write!(f, "admin"),
            Self::SystemOwner => write!(f, "system_owner"),
        }
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            "system_owner" => Ok(Self::SystemOwner),
            _ => Err(format!("invalid user type: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_type_roundtrip() {
        for user_type in [UserType::Member, UserType::Admin, UserType::SystemOwner] {
            let parsed: UserType = user_type.to_string().parse().unwrap();
            assert_eq!(parsed, user_type);
        }
        assert!("owner".parse::<UserType>().is_err());
    }

    #[test]
    fn test_payment_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn test_membership_is_active() {
        assert!(MembershipStatus::Active.is_active());
        assert!(!MembershipStatus::Expired.is_active());
    }
}
