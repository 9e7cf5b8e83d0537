//! Debounced shipping-rate lookup.
//!
//! Each PIN-code edit restarts a 500 ms timer; only the last edit in a burst
//! reaches the carrier. Incomplete input clears the state immediately and
//! cancels anything scheduled. Results of superseded lookups are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use clubhouse_core::PostalCode;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{RateQuery, RateSource, ShippingError, ShippingState, cheapest_courier};
use crate::error::Categorized;

/// Quiet period after the last edit before the carrier is called.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
struct Parcel {
    item_count: u32,
    declared_value: Decimal,
    cod: bool,
}

/// Drives [`ShippingState`] from PIN-code input.
///
/// Lookups run on the Tokio runtime; [`postal_code_changed`] must be called
/// from within one. Dropping the lookup cancels any scheduled fetch.
///
/// [`postal_code_changed`]: RateLookup::postal_code_changed
pub struct RateLookup<S> {
    inner: Arc<LookupInner<S>>,
}

struct LookupInner<S> {
    source: S,
    pickup: PostalCode,
    debounce: Duration,
    state: watch::Sender<ShippingState>,
    generation: AtomicU64,
    parcel: Mutex<Parcel>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<S: RateSource> RateLookup<S> {
    /// Create a lookup quoting parcels shipped from `pickup`.
    #[must_use]
    pub fn new(source: S, pickup: PostalCode) -> Self {
        Self::with_debounce(source, pickup, DEFAULT_DEBOUNCE)
    }

    #[must_use]
    pub fn with_debounce(source: S, pickup: PostalCode, debounce: Duration) -> Self {
        let (state, _) = watch::channel(ShippingState::Idle);
        Self {
            inner: Arc::new(LookupInner {
                source,
                pickup,
                debounce,
                state,
                generation: AtomicU64::new(0),
                parcel: Mutex::new(Parcel {
                    item_count: 1,
                    declared_value: Decimal::ZERO,
                    cod: false,
                }),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ShippingState> {
        self.inner.state.subscribe()
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> ShippingState {
        self.inner.state.borrow().clone()
    }

    /// Describe the parcel used by subsequent lookups.
    pub fn set_parcel(&self, item_count: u32, declared_value: Decimal, cod: bool) {
        *self.inner.parcel.lock().unwrap_or_else(PoisonError::into_inner) = Parcel {
            item_count,
            declared_value,
            cod,
        };
    }

    /// React to an edit of the delivery PIN-code field.
    pub fn postal_code_changed(&self, input: &str) {
        self.cancel_pending();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Ok(postcode) = PostalCode::parse(input) else {
            self.inner.state.send_replace(ShippingState::Idle);
            return;
        };

        self.inner.state.send_replace(ShippingState::Pending {
            postcode: postcode.clone(),
        });

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            let outcome = inner.lookup(&postcode).await;
            inner.publish(generation, outcome);
        });
        *self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Clear the PIN code: cancel any scheduled fetch and go back to `Idle`.
    pub fn clear(&self) {
        self.postal_code_changed("");
    }

    /// Wait until no lookup is pending and return the settled state.
    pub async fn settled(&self) -> ShippingState {
        let mut rx = self.subscribe();
        rx.wait_for(|s| !s.is_pending())
            .await
            .map_or_else(|_| self.state(), |s| s.clone())
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl<S: RateSource> LookupInner<S> {
    async fn lookup(&self, postcode: &PostalCode) -> ShippingState {
        let parcel = *self.parcel.lock().unwrap_or_else(PoisonError::into_inner);
        let mut query = RateQuery::for_items(
            self.pickup.clone(),
            postcode.clone(),
            parcel.item_count,
            parcel.declared_value,
        );
        query.cod = parcel.cod;

        match self.source.courier_rates(&query).await {
            Ok(options) => match cheapest_courier(&options) {
                Some(rate) => {
                    tracing::info!(
                        postcode = %postcode,
                        courier = %rate.courier_name,
                        rate = %rate.rate,
                        "Shipping quoted"
                    );
                    ShippingState::Quoted {
                        postcode: postcode.clone(),
                        rate,
                    }
                }
                None => {
                    tracing::info!(postcode = %postcode, "No courier serves PIN code");
                    ShippingState::DeliveryUnavailable {
                        postcode: postcode.clone(),
                    }
                }
            },
            Err(e) => {
                report_failure(&e);
                ShippingState::Failed {
                    postcode: postcode.clone(),
                    message: e.user_message(),
                }
            }
        }
    }

    /// Publish `state` unless a newer edit superseded this lookup.
    fn publish(&self, generation: u64, state: ShippingState) {
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = state;
            true
        });
    }
}

fn report_failure(e: &ShippingError) {
    match e {
        ShippingError::NotConfigured => {
            tracing::warn!("Shipping lookup skipped: carrier token not configured");
        }
        _ => {
            crate::error::report(e);
        }
    }
}

impl<S> Drop for RateLookup<S> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
