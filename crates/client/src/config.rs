//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CLUBHOUSE_API_URL` - Base URL of the Clubhouse backend API
//!
//! ## Optional
//! - `CLUBHOUSE_SESSION_FILE` - Where the session is persisted
//!   (default: `$HOME/.clubhouse/session.json`)
//! - `CLUBHOUSE_HTTP_TIMEOUT_SECS` - Backend request timeout (default: 30)
//! - `SHIPROCKET_API_URL` - Carrier aggregator API (default: Shiprocket v1 external API)
//! - `SHIPROCKET_API_TOKEN` - Carrier aggregator bearer token
//! - `SHIPPING_PICKUP_POSTCODE` - Warehouse PIN code (default: 110001)
//! - `SHIPPING_TIMEOUT_SECS` - Carrier request timeout (default: 10)
//! - `RAZORPAY_KEY_ID` - Public Razorpay key handed to the checkout popup
//! - `PLATFORM_FEE_PERCENT` - Platform fee (default: 5)
//! - `PLATFORM_FEE_GST_PERCENT` - GST on the platform fee (default: 18)
//! - `GATEWAY_FEE_PERCENT` - Payment gateway fee (default: 2)
//! - `GATEWAY_FEE_GST_PERCENT` - GST on the gateway fee (default: 18)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clubhouse_core::{FeeSchedule, PostalCode};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_SHIPROCKET_API_URL: &str = "https://apiv2.shiprocket.in/v1/external";
const DEFAULT_PICKUP_POSTCODE: &str = "110001";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "enter-",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend API base URL
    pub api_url: Url,
    /// Persisted session location
    pub session_file: PathBuf,
    /// Backend request timeout
    pub http_timeout: Duration,
    /// Courier-rate lookup configuration
    pub shipping: ShippingConfig,
    /// Payment gateway configuration
    pub payment: PaymentConfig,
    /// Fee percentages applied at checkout
    pub fees: FeeSchedule,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Carrier aggregator configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ShippingConfig {
    pub api_url: Url,
    pub api_token: Option<SecretString>,
    pub pickup_postcode: PostalCode,
    pub timeout: Duration,
}

impl std::fmt::Debug for ShippingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippingConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("pickup_postcode", &self.pickup_postcode)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Default)]
pub struct PaymentConfig {
    /// Public key id the checkout popup is opened with
    pub razorpay_key_id: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the carrier token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_base_url("CLUBHOUSE_API_URL", &get_required_env("CLUBHOUSE_API_URL")?)?;
        let session_file = get_optional_env("CLUBHOUSE_SESSION_FILE")
            .map_or_else(default_session_file, PathBuf::from);
        let http_timeout = Duration::from_secs(parse_env_or("CLUBHOUSE_HTTP_TIMEOUT_SECS", 30)?);

        Ok(Self {
            api_url,
            session_file,
            http_timeout,
            shipping: ShippingConfig::from_env()?,
            payment: PaymentConfig {
                razorpay_key_id: get_optional_env("RAZORPAY_KEY_ID"),
            },
            fees: fees_from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration pointing at `api_url` with defaults everywhere else.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not a valid URL.
    pub fn for_api(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_base_url("CLUBHOUSE_API_URL", api_url)?,
            session_file: default_session_file(),
            http_timeout: Duration::from_secs(30),
            shipping: ShippingConfig {
                api_url: parse_base_url("SHIPROCKET_API_URL", DEFAULT_SHIPROCKET_API_URL)?,
                api_token: None,
                pickup_postcode: parse_postcode("SHIPPING_PICKUP_POSTCODE", DEFAULT_PICKUP_POSTCODE)?,
                timeout: Duration::from_secs(10),
            },
            payment: PaymentConfig::default(),
            fees: FeeSchedule::default(),
            sentry_dsn: None,
        })
    }
}

impl ShippingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_url = parse_base_url(
            "SHIPROCKET_API_URL",
            &get_env_or_default("SHIPROCKET_API_URL", DEFAULT_SHIPROCKET_API_URL),
        )?;
        let api_token = get_optional_env("SHIPROCKET_API_TOKEN")
            .map(|token| {
                validate_not_placeholder(&token, "SHIPROCKET_API_TOKEN")?;
                Ok(SecretString::from(token))
            })
            .transpose()?;
        let pickup_postcode = parse_postcode(
            "SHIPPING_PICKUP_POSTCODE",
            &get_env_or_default("SHIPPING_PICKUP_POSTCODE", DEFAULT_PICKUP_POSTCODE),
        )?;
        let timeout = Duration::from_secs(parse_env_or("SHIPPING_TIMEOUT_SECS", 10)?);

        Ok(Self {
            api_url,
            api_token,
            pickup_postcode,
            timeout,
        })
    }
}

/// Fee percentages from the environment, with defaults for anything unset.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for a value that is not a
/// percentage between 0 and 100.
pub fn fees_from_env() -> Result<FeeSchedule, ConfigError> {
    let defaults = FeeSchedule::default();
    Ok(FeeSchedule {
        platform_rate: parse_percent("PLATFORM_FEE_PERCENT", defaults.platform_rate)?,
        platform_gst_rate: parse_percent("PLATFORM_FEE_GST_PERCENT", defaults.platform_gst_rate)?,
        gateway_rate: parse_percent("GATEWAY_FEE_PERCENT", defaults.gateway_rate)?,
        gateway_gst_rate: parse_percent("GATEWAY_FEE_GST_PERCENT", defaults.gateway_gst_rate)?,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a fee percentage; must be within 0..=100.
fn parse_percent(key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    let value = parse_env_or(key, default)?;
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{value} is not a percentage between 0 and 100"),
        ));
    }
    Ok(value)
}

/// Parse a base URL so that relative joins append to its path.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_postcode(key: &str, raw: &str) -> Result<PostalCode, ConfigError> {
    PostalCode::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn default_session_file() -> PathBuf {
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from(".clubhouse-session.json"),
        |home| PathBuf::from(home).join(".clubhouse").join("session.json"),
    )
}

/// Reject values that are obviously copied from a template.
fn validate_not_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_base_url_appends_slash() {
        let url = parse_base_url("X", "https://api.clubhouse.test/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.clubhouse.test/v1/");
        assert_eq!(
            url.join("clubs").unwrap().as_str(),
            "https://api.clubhouse.test/v1/clubs"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(matches!(
            parse_base_url("X", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_base_url("X", "mailto:fan@club.in").is_err());
    }

    #[test]
    fn test_placeholder_tokens_rejected() {
        assert!(validate_not_placeholder("your-shiprocket-token", "T").is_err());
        assert!(validate_not_placeholder("CHANGEME", "T").is_err());
        assert!(validate_not_placeholder("eyJhbGciOiJIUzI1NiJ9.abc", "T").is_ok());
    }

    #[test]
    fn test_for_api_defaults() {
        let config = ClientConfig::for_api("http://127.0.0.1:9000/api").unwrap();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:9000/api/");
        assert_eq!(config.shipping.pickup_postcode.as_str(), "110001");
        assert_eq!(config.fees.platform_rate, dec!(5));
        assert!(config.shipping.api_token.is_none());
    }

    #[test]
    fn test_shipping_config_debug_redacts_token() {
        let config = ShippingConfig {
            api_url: Url::parse("https://apiv2.shiprocket.in/v1/external/").unwrap(),
            api_token: Some(SecretString::from("super_secret_carrier_token")),
            pickup_postcode: PostalCode::parse("560001").unwrap(),
            timeout: Duration::from_secs(10),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("560001"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_carrier_token"));
    }
}
