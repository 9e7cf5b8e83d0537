//! Courier-rate lookups against the mock carrier API.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use clubhouse_client::config::ShippingConfig;
use clubhouse_client::shipping::{RateQuery, RateSource, ShippingError, cheapest_courier};
use clubhouse_client::{RateLookup, ShippingState, ShiprocketClient};
use clubhouse_core::PostalCode;
use clubhouse_integration_tests::{
    MockBackend, PIN_ALL_DISABLED, PIN_NOT_FOUND, PIN_SERVER_ERROR, PIN_SLOW, SHIPROCKET_TOKEN,
    fixture_rate,
};
use rust_decimal_macros::dec;
use secrecy::SecretString;

fn config(backend: &MockBackend) -> ShippingConfig {
    ShippingConfig {
        api_url: backend.shiprocket_url(),
        api_token: Some(SecretString::from(SHIPROCKET_TOKEN)),
        pickup_postcode: PostalCode::parse("110001").unwrap(),
        timeout: Duration::from_secs(2),
    }
}

fn query(delivery: &str, items: u32) -> RateQuery {
    RateQuery::for_items(
        PostalCode::parse("110001").unwrap(),
        PostalCode::parse(delivery).unwrap(),
        items,
        dec!(1299),
    )
}

// =============================================================================
// Shiprocket client
// =============================================================================

#[tokio::test]
async fn test_rates_parse_and_cheapest_skips_disabled() {
    let backend = MockBackend::start().await.unwrap();
    let client = ShiprocketClient::new(&config(&backend)).unwrap();

    let rates = client.courier_rates(&query("560001", 1)).await.unwrap();

    assert_eq!(rates.len(), 3);
    assert!(rates.iter().any(|r| r.courier_disabled));
    // Delivery days arrive as both numbers and strings.
    assert_eq!(rates[0].estimated_delivery_days, Some(6));
    assert_eq!(rates[1].estimated_delivery_days, Some(5));
    assert_eq!(cheapest_courier(&rates), fixture_rate(2));
}

#[tokio::test]
async fn test_repeat_query_is_served_from_cache() {
    let backend = MockBackend::start().await.unwrap();
    let client = ShiprocketClient::new(&config(&backend)).unwrap();

    let first = client.courier_rates(&query("560001", 2)).await.unwrap();
    let second = client.courier_rates(&query("560001", 2)).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(backend.recorded().courier_queries.len(), 1);

    // A different parcel is a different cache key.
    client.courier_rates(&query("560001", 3)).await.unwrap();
    assert_eq!(backend.recorded().courier_queries.len(), 2);
}

#[tokio::test]
async fn test_not_found_means_no_couriers() {
    let backend = MockBackend::start().await.unwrap();
    let client = ShiprocketClient::new(&config(&backend)).unwrap();

    let rates = client.courier_rates(&query(PIN_NOT_FOUND, 1)).await.unwrap();
    assert!(rates.is_empty());
}

#[tokio::test]
async fn test_server_error_is_not_cached() {
    let backend = MockBackend::start().await.unwrap();
    let client = ShiprocketClient::new(&config(&backend)).unwrap();

    for _ in 0..2 {
        let err = client
            .courier_rates(&query(PIN_SERVER_ERROR, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ShippingError::Api { status: 500, .. }));
    }
    assert_eq!(backend.recorded().courier_queries.len(), 2);
}

#[tokio::test]
async fn test_missing_token_is_not_configured() {
    let backend = MockBackend::start().await.unwrap();
    let client = ShiprocketClient::new(&ShippingConfig {
        api_token: None,
        ..config(&backend)
    })
    .unwrap();

    let err = client.courier_rates(&query("560001", 1)).await.unwrap_err();
    assert!(matches!(err, ShippingError::NotConfigured));
    assert!(backend.recorded().courier_queries.is_empty());
}

#[tokio::test]
async fn test_slow_carrier_times_out() {
    let backend = MockBackend::start().await.unwrap();
    let client = ShiprocketClient::new(&ShippingConfig {
        timeout: Duration::from_millis(200),
        ..config(&backend)
    })
    .unwrap();

    let err = client.courier_rates(&query(PIN_SLOW, 1)).await.unwrap_err();
    assert!(matches!(err, ShippingError::Timeout));
}

// =============================================================================
// Debounced lookup
// =============================================================================

fn lookup(backend: &MockBackend) -> RateLookup<ShiprocketClient> {
    RateLookup::with_debounce(
        ShiprocketClient::new(&config(backend)).unwrap(),
        PostalCode::parse("110001").unwrap(),
        Duration::from_millis(50),
    )
}

#[tokio::test]
async fn test_typing_a_pin_code_fetches_once() {
    let backend = MockBackend::start().await.unwrap();
    let lookup = lookup(&backend);

    for partial in ["5", "56", "560", "5600", "56000"] {
        lookup.postal_code_changed(partial);
        assert_eq!(lookup.state(), ShippingState::Idle);
    }
    lookup.postal_code_changed("560001");
    assert!(lookup.state().is_pending());

    let settled = lookup.settled().await;
    assert!(matches!(settled, ShippingState::Quoted { .. }));
    assert_eq!(settled.charge(), dec!(85));
    assert_eq!(backend.recorded().courier_queries.len(), 1);
}

#[tokio::test]
async fn test_quick_edit_only_quotes_latest_pin() {
    let backend = MockBackend::start().await.unwrap();
    let lookup = lookup(&backend);

    lookup.postal_code_changed("560001");
    lookup.postal_code_changed("560002");
    let settled = lookup.settled().await;

    let ShippingState::Quoted { postcode, .. } = &settled else {
        panic!("expected a quote, got {settled:?}");
    };
    assert_eq!(postcode.as_str(), "560002");

    let recorded = backend.recorded();
    assert_eq!(recorded.courier_queries.len(), 1);
    assert_eq!(recorded.courier_queries[0]["delivery_postcode"], "560002");
}

#[tokio::test]
async fn test_lookup_outcomes() {
    let backend = MockBackend::start().await.unwrap();
    let lookup = lookup(&backend);

    lookup.postal_code_changed(PIN_ALL_DISABLED);
    let settled = lookup.settled().await;
    assert!(matches!(settled, ShippingState::DeliveryUnavailable { .. }));
    assert!(settled.blocks_submission());

    lookup.postal_code_changed(PIN_NOT_FOUND);
    assert!(matches!(
        lookup.settled().await,
        ShippingState::DeliveryUnavailable { .. }
    ));

    lookup.postal_code_changed(PIN_SERVER_ERROR);
    let settled = lookup.settled().await;
    assert!(matches!(settled, ShippingState::Failed { .. }));
    assert_eq!(settled.charge(), dec!(0));

    lookup.clear();
    assert_eq!(lookup.state(), ShippingState::Idle);
}
