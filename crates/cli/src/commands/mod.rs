//! Command implementations.

pub mod account;
pub mod checkout;
pub mod clubs;
pub mod quote;
pub mod shipping;

use clubhouse_client::{ApiClient, AuthContext, ClientConfig, FileSessionStore};
use clubhouse_core::{CurrencyCode, Money};
use rust_decimal::Decimal;

use crate::error::CliError;

/// Configuration plus an API client carrying the persisted session.
pub struct Context {
    pub config: ClientConfig,
    pub api: ApiClient,
}

/// Load configuration and restore the persisted session.
pub async fn connect() -> Result<Context, CliError> {
    let config = ClientConfig::from_env()?;
    let auth = AuthContext::new(FileSessionStore::new(config.session_file.clone()));
    if let Some(user_type) = auth.init().await? {
        tracing::debug!(%user_type, "Using persisted session");
    }
    let api = ApiClient::new(&config, auth)?;
    Ok(Context { config, api })
}

/// Format an amount for display.
pub fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Money::new(amount, currency).to_string()
}
