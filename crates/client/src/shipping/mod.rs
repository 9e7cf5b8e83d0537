//! Shipping-rate lookup.
//!
//! Merchandise checkouts quote delivery through a carrier aggregator
//! (Shiprocket). The cheapest enabled courier for the delivery PIN code sets
//! the shipping charge; a PIN code no courier serves blocks the checkout.
//!
//! - [`ShiprocketClient`] - [`RateSource`] over the Shiprocket REST API, with a
//!   5 minute quote cache
//! - [`RateLookup`] - Debounced lookup driven by PIN-code edits, publishing
//!   [`ShippingState`] on a watch channel

mod lookup;
mod shiprocket;

use std::future::Future;

use clubhouse_core::PostalCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::error::{Categorized, ErrorCategory};

pub use lookup::{DEFAULT_DEBOUNCE, RateLookup};
pub use shiprocket::ShiprocketClient;

/// Parcel weight charged per merchandise item, in kilograms.
pub const KG_PER_ITEM: u32 = 1;

/// Parcel weight for `item_count` items; never less than one kilogram.
#[must_use]
pub fn parcel_weight_kg(item_count: u32) -> u32 {
    item_count.saturating_mul(KG_PER_ITEM).max(1)
}

/// Errors from the carrier aggregator.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// No carrier API token is configured.
    #[error("carrier API token is not configured")]
    NotConfigured,

    #[error("carrier request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("carrier API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Categorized for ShippingError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }

    fn user_message(&self) -> String {
        match self {
            Self::Timeout => {
                "Delivery charges are taking too long to load. Please try again.".to_string()
            }
            _ => "Could not check delivery to this PIN code. Please try again.".to_string(),
        }
    }
}

/// A parcel to quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateQuery {
    pub pickup_postcode: PostalCode,
    pub delivery_postcode: PostalCode,
    pub weight_kg: u32,
    pub declared_value: Decimal,
    pub cod: bool,
}

impl RateQuery {
    /// A prepaid parcel of `item_count` items.
    #[must_use]
    pub fn for_items(
        pickup_postcode: PostalCode,
        delivery_postcode: PostalCode,
        item_count: u32,
        declared_value: Decimal,
    ) -> Self {
        Self {
            pickup_postcode,
            delivery_postcode,
            weight_kg: parcel_weight_kg(item_count),
            declared_value,
            cod: false,
        }
    }
}

/// One courier's offer for a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierRate {
    pub courier_company_id: u64,
    pub courier_name: String,
    pub rate: Decimal,
    #[serde(default)]
    pub courier_disabled: bool,
    #[serde(default, deserialize_with = "delivery_days")]
    pub estimated_delivery_days: Option<u32>,
}

/// Shiprocket reports delivery days as either a number or a numeric string.
fn delivery_days<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Days {
        Number(u32),
        Text(String),
    }

    Ok(match Option::<Days>::deserialize(deserializer)? {
        Some(Days::Number(n)) => Some(n),
        Some(Days::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// The cheapest courier that is not disabled.
#[must_use]
pub fn cheapest_courier(options: &[CourierRate]) -> Option<CourierRate> {
    options
        .iter()
        .filter(|o| !o.courier_disabled)
        .min_by(|a, b| a.rate.cmp(&b.rate))
        .cloned()
}

/// Something that can quote courier rates.
pub trait RateSource: Send + Sync + 'static {
    /// All courier offers for `query`, including disabled ones.
    fn courier_rates(
        &self,
        query: &RateQuery,
    ) -> impl Future<Output = Result<Vec<CourierRate>, ShippingError>> + Send;
}

/// Where the shipping quote for the current PIN code stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ShippingState {
    /// No complete PIN code entered.
    #[default]
    Idle,
    /// A lookup is scheduled or in flight.
    Pending { postcode: PostalCode },
    /// The cheapest courier for the PIN code.
    Quoted { postcode: PostalCode, rate: CourierRate },
    /// No enabled courier serves the PIN code.
    DeliveryUnavailable { postcode: PostalCode },
    /// The carrier API failed or timed out.
    Failed { postcode: PostalCode, message: String },
}

impl ShippingState {
    /// Whether a checkout that needs shipping must wait or stop.
    #[must_use]
    pub const fn blocks_submission(&self) -> bool {
        !matches!(self, Self::Quoted { .. })
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// The quoted courier, if any.
    #[must_use]
    pub const fn rate(&self) -> Option<&CourierRate> {
        match self {
            Self::Quoted { rate, .. } => Some(rate),
            _ => None,
        }
    }

    /// Shipping charge to add to the order; zero unless quoted.
    #[must_use]
    pub fn charge(&self) -> Decimal {
        self.rate().map_or(Decimal::ZERO, |r| r.rate)
    }

    /// A short line describing the state, for display next to the PIN field.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Idle => "Enter a 6-digit PIN code".to_string(),
            Self::Pending { .. } => "Checking delivery...".to_string(),
            Self::Quoted { rate, .. } => match rate.estimated_delivery_days {
                Some(days) => format!(
                    "{} - Rs. {} (delivery in {days} days)",
                    rate.courier_name,
                    rate.rate.round_dp(2)
                ),
                None => format!("{} - Rs. {}", rate.courier_name, rate.rate.round_dp(2)),
            },
            Self::DeliveryUnavailable { postcode } => {
                format!("Delivery is not available to {postcode}")
            }
            Self::Failed { message, .. } => message.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn courier(id: u64, rate: Decimal, disabled: bool) -> CourierRate {
        CourierRate {
            courier_company_id: id,
            courier_name: format!("Courier {id}"),
            rate,
            courier_disabled: disabled,
            estimated_delivery_days: Some(4),
        }
    }

    #[test]
    fn test_parcel_weight() {
        assert_eq!(parcel_weight_kg(0), 1);
        assert_eq!(parcel_weight_kg(1), 1);
        assert_eq!(parcel_weight_kg(4), 4);
    }

    #[test]
    fn test_cheapest_skips_disabled() {
        let options = vec![
            courier(1, dec!(80), false),
            courier(2, dec!(45), true),
            courier(3, dec!(60), false),
        ];
        assert_eq!(cheapest_courier(&options).unwrap().courier_company_id, 3);
    }

    #[test]
    fn test_cheapest_none_when_all_disabled() {
        assert!(cheapest_courier(&[courier(1, dec!(80), true)]).is_none());
        assert!(cheapest_courier(&[]).is_none());
    }

    #[test]
    fn test_blocks_submission() {
        let postcode = PostalCode::parse("560001").unwrap();
        assert!(ShippingState::Idle.blocks_submission());
        assert!(
            ShippingState::DeliveryUnavailable {
                postcode: postcode.clone()
            }
            .blocks_submission()
        );
        assert!(
            ShippingState::Failed {
                postcode: postcode.clone(),
                message: "timeout".to_string()
            }
            .blocks_submission()
        );

        let quoted = ShippingState::Quoted {
            postcode,
            rate: courier(1, dec!(80), false),
        };
        assert!(!quoted.blocks_submission());
        assert_eq!(quoted.charge(), dec!(80));
    }

    #[test]
    fn test_courier_rate_parses_string_days() {
        let json = r#"{
            "courier_company_id": 10,
            "courier_name": "Delhivery Surface",
            "rate": 72.5,
            "courier_disabled": false,
            "estimated_delivery_days": "5"
        }"#;
        let rate: CourierRate = serde_json::from_str(json).unwrap();
        assert_eq!(rate.estimated_delivery_days, Some(5));
        assert_eq!(rate.rate, dec!(72.5));
    }
}
