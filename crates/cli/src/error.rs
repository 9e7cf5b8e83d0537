//! CLI errors.

use clubhouse_client::checkout::CheckoutError;
use clubhouse_client::coupon::CouponError;
use clubhouse_client::error::Categorized;
use clubhouse_client::reservation::ReservationError;
use clubhouse_client::shipping::ShippingError;
use clubhouse_client::{ApiError, ConfigError, SessionError};
use clubhouse_core::PricingError;
use thiserror::Error;

/// Anything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Points(#[from] ReservationError),

    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A command-line argument was rejected.
    #[error("{0}")]
    Input(String),
}

impl CliError {
    /// What to print for the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => format!("Configuration problem: {e}"),
            Self::Session(SessionError::NotSignedIn) => {
                "You are not signed in. Run `ch-cli login` first.".to_string()
            }
            Self::Session(e) => e.to_string(),
            Self::Api(e) => e.user_message(),
            Self::Coupon(e) => e.user_message(),
            Self::Points(e) => e.user_message(),
            Self::Shipping(e) => e.user_message(),
            Self::Checkout(e) => e.user_message(),
            Self::Pricing(e) => e.to_string(),
            Self::Io(e) => format!("I/O error: {e}"),
            Self::Input(message) => message.clone(),
        }
    }
}
