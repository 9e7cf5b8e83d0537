//! Delivery quote command.

use clubhouse_client::shipping::{RateLookup, ShiprocketClient, ShippingState};
use clubhouse_client::ClientConfig;
use rust_decimal::Decimal;

use crate::error::CliError;

/// Print the cheapest courier for a PIN code.
pub async fn quote(postcode: &str, items: u32, value: Decimal, cod: bool) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let carrier = ShiprocketClient::new(&config.shipping)?;
    let lookup = RateLookup::new(carrier, config.shipping.pickup_postcode.clone());
    lookup.set_parcel(items, value, cod);

    lookup.postal_code_changed(postcode);
    if lookup.state() == ShippingState::Idle {
        return Err(CliError::Input(format!(
            "`{postcode}` is not a 6-digit PIN code."
        )));
    }

    let state = lookup.settled().await;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", state.describe());
    }
    match state {
        ShippingState::Failed { message, .. } => Err(CliError::Input(message)),
        _ => Ok(()),
    }
}
