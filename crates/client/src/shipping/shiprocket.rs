//! Shiprocket courier serviceability client.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::{CourierRate, RateQuery, RateSource, ShippingError};
use crate::config::ShippingConfig;

#[derive(Deserialize)]
struct ServiceabilityResponse {
    #[serde(default)]
    data: Option<ServiceabilityData>,
}

#[derive(Deserialize)]
struct ServiceabilityData {
    #[serde(default)]
    available_courier_companies: Vec<CourierRate>,
}

/// Client for Shiprocket's courier serviceability endpoint.
///
/// Quotes are cached per [`RateQuery`] for 5 minutes. Failures are never
/// cached.
#[derive(Clone)]
pub struct ShiprocketClient {
    inner: Arc<ShiprocketClientInner>,
}

struct ShiprocketClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    cache: Cache<RateQuery, Vec<CourierRate>>,
}

impl ShiprocketClient {
    /// Create a new Shiprocket client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ShippingConfig) -> Result<Self, ShippingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ShiprocketClientInner {
                client,
                base_url: config.api_url.clone(),
                token: config.api_token.clone(),
                cache,
            }),
        })
    }

    async fn fetch(&self, query: &RateQuery) -> Result<Vec<CourierRate>, ShippingError> {
        let token = self.inner.token.as_ref().ok_or(ShippingError::NotConfigured)?;
        let url = self.inner.base_url.join("courier/serviceability/")?;

        let weight = query.weight_kg.to_string();
        let declared_value = query.declared_value.round_dp(2).to_string();
        let params = [
            ("pickup_postcode", query.pickup_postcode.as_str()),
            ("delivery_postcode", query.delivery_postcode.as_str()),
            ("weight", weight.as_str()),
            ("declared_value", declared_value.as_str()),
            ("cod", if query.cod { "1" } else { "0" }),
        ];

        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .query(&params)
            .send()
            .await
            .map_err(timeout_or_http)?;

        let status = response.status();

        // Shiprocket answers unserviceable PIN codes with 404
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let body = response.text().await.map_err(timeout_or_http)?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Shiprocket API returned non-success status"
            );
            return Err(ShippingError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let parsed: ServiceabilityResponse = serde_json::from_str(&body)?;
        Ok(parsed
            .data
            .map(|d| d.available_courier_companies)
            .unwrap_or_default())
    }
}

fn timeout_or_http(e: reqwest::Error) -> ShippingError {
    if e.is_timeout() {
        ShippingError::Timeout
    } else {
        ShippingError::Http(e)
    }
}

impl RateSource for ShiprocketClient {
    #[instrument(skip(self), fields(delivery_postcode = %query.delivery_postcode))]
    async fn courier_rates(&self, query: &RateQuery) -> Result<Vec<CourierRate>, ShippingError> {
        if let Some(cached) = self.inner.cache.get(query).await {
            tracing::debug!("Courier rates served from cache");
            return Ok(cached);
        }

        let options = self.fetch(query).await?;
        tracing::debug!(couriers = options.len(), "Fetched courier rates");
        self.inner
            .cache
            .insert(query.clone(), options.clone())
            .await;
        Ok(options)
    }
}
