//! Checkout form validation.

use clubhouse_core::{Email, PostalCode};
use thiserror::Error;

use crate::api::{ContactDetails, ShippingAddress};
use crate::shipping::ShippingState;

const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

/// Why a checkout form cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("phone number must have 10 to 15 digits")]
    InvalidPhone,

    #[error("delivery is not available to {0}")]
    DeliveryUnavailable(PostalCode),

    #[error("shipping charges are still loading")]
    ShippingPending,

    #[error("shipping has not been quoted for this address")]
    ShippingNotQuoted,

    #[error("shipping lookup failed: {0}")]
    ShippingFailed(String),
}

impl FormError {
    /// Message shown next to the form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField(field) => format!("Please enter your {field}."),
            Self::InvalidEmail => "Please enter a valid email address.".to_string(),
            Self::InvalidPhone => "Please enter a valid phone number.".to_string(),
            Self::DeliveryUnavailable(postcode) => {
                format!("Sorry, we cannot deliver to PIN code {postcode}.")
            }
            Self::ShippingPending => "Please wait while we check delivery charges.".to_string(),
            Self::ShippingNotQuoted => {
                "Please enter a delivery PIN code to calculate shipping.".to_string()
            }
            Self::ShippingFailed(message) => message.clone(),
        }
    }
}

/// The buyer-editable part of a checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<ShippingAddress>,
    pub shipping_required: bool,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm {
    pub contact: ContactDetails,
    pub address: Option<ShippingAddress>,
}

impl CheckoutForm {
    /// Check the form against the current shipping state.
    ///
    /// An unserviceable PIN code is reported before any other problem.
    ///
    /// # Errors
    ///
    /// Returns the first [`FormError`] found.
    pub fn validate(&self, shipping: &ShippingState) -> Result<ValidatedForm, FormError> {
        if self.shipping_required
            && let ShippingState::DeliveryUnavailable { postcode } = shipping
        {
            return Err(FormError::DeliveryUnavailable(postcode.clone()));
        }

        let name = required(&self.name, "name")?;
        let email = required(&self.email, "email")?
            .parse::<Email>()
            .map_err(|_| FormError::InvalidEmail)?;
        let phone = normalize_phone(required(&self.phone, "phone number")?)?;

        let address = if self.shipping_required {
            Some(validate_shipping(self.address.as_ref(), shipping)?)
        } else {
            None
        };

        Ok(ValidatedForm {
            contact: ContactDetails {
                name: name.to_string(),
                email,
                phone,
            },
            address,
        })
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, FormError> {
    let value = value.trim();
    if value.is_empty() {
        Err(FormError::MissingField(field))
    } else {
        Ok(value)
    }
}

/// Strip separators and check the digit count. A leading `+` is kept.
fn normalize_phone(raw: &str) -> Result<String, FormError> {
    let (prefix, rest) = raw
        .strip_prefix('+')
        .map_or(("", raw), |rest| ("+", rest));
    let digits: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if !digits.chars().all(|c| c.is_ascii_digit())
        || !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
    {
        return Err(FormError::InvalidPhone);
    }
    Ok(format!("{prefix}{digits}"))
}

fn validate_shipping(
    address: Option<&ShippingAddress>,
    shipping: &ShippingState,
) -> Result<ShippingAddress, FormError> {
    let address = address.ok_or(FormError::MissingField("delivery address"))?;
    required(&address.line1, "address")?;
    required(&address.city, "city")?;
    required(&address.state, "state")?;
    let postcode = PostalCode::parse(required(&address.postal_code, "PIN code")?)
        .map_err(|_| FormError::ShippingNotQuoted)?;

    match shipping {
        ShippingState::Quoted { postcode: quoted, .. } if *quoted == postcode => {
            Ok(address.clone())
        }
        ShippingState::Pending { .. } => Err(FormError::ShippingPending),
        ShippingState::Failed { message, .. } => Err(FormError::ShippingFailed(message.clone())),
        ShippingState::DeliveryUnavailable { postcode } => {
            Err(FormError::DeliveryUnavailable(postcode.clone()))
        }
        ShippingState::Idle | ShippingState::Quoted { .. } => Err(FormError::ShippingNotQuoted),
    }
}
