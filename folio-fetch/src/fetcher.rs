//! Cached "get-or-refresh" fetching.

use std::any::Any;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use folio_cache::CacheStore;
use folio_core::error::{FolioError, Result};

use crate::inflight::InFlight;

type AnyValue = Arc<dyn Any + Send + Sync>;

/// Where a fetched value came from.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchSource {
    /// A fresh cache entry; no request was made.
    Cache,
    /// The remote endpoint, just now.
    Network,
    /// An expired cache entry, returned because the refresh failed.
    Stale(FolioError),
}

/// A value returned by [`ResourceFetcher::fetch`].
#[derive(Clone, Debug)]
pub struct Fetched<V> {
    value: Arc<V>,
    source: FetchSource,
}

impl<V> Fetched<V> {
    fn new(value: Arc<V>, source: FetchSource) -> Self {
        Self { value, source }
    }

    /// The value.
    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    /// Where the value came from.
    pub fn source(&self) -> &FetchSource {
        &self.source
    }

    /// The refresh error, when the value is a stale fallback.
    pub fn warning(&self) -> Option<&FolioError> {
        match &self.source {
            FetchSource::Stale(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the value is a stale fallback.
    pub fn is_stale(&self) -> bool {
        self.warning().is_some()
    }

    /// Consumes the wrapper, returning the value.
    pub fn into_value(self) -> Arc<V> {
        self.value
    }
}

impl<V> Deref for Fetched<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

/// Combines the cache store and the in-flight coordinator with a remote call.
///
/// # Flow
/// 1. Unless forced, a fresh cache entry is returned without a request.
/// 2. Otherwise the request goes through the coordinator, so concurrent
///    callers (forced or not) share one call. A successful result is written
///    to the cache before anyone sees it.
/// 3. If the request fails, an expired entry is returned as a fallback with
///    the error attached; with no entry at all, the error is returned.
pub struct ResourceFetcher {
    store: Arc<CacheStore>,
    in_flight: InFlight<String, AnyValue, FolioError>,
}

impl ResourceFetcher {
    /// Creates a fetcher over `store`.
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            in_flight: InFlight::new(),
        }
    }

    /// Returns the cache store.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Whether a request for `key` is outstanding.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.is_in_flight(&key.to_string())
    }

    /// Drops the cached entry for `key`.
    pub fn invalidate(&self, key: &str) {
        self.store.invalidate(key);
    }

    /// Gets `key` from the cache if younger than `ttl`, otherwise via
    /// `network_call`.
    ///
    /// All callers sharing a key must ask for the same `V`.
    pub async fn fetch<V, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        force_refresh: bool,
        network_call: F,
    ) -> Result<Fetched<V>>
    where
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        if !force_refresh && self.store.is_valid(key, ttl) {
            if let Some(entry) = self.store.get::<V>(key) {
                debug!(key, "Cache hit");
                return Ok(Fetched::new(Arc::new(entry.value), FetchSource::Cache));
            }
        }

        debug!(key, force_refresh, "Cache miss, fetching");

        let store = Arc::clone(&self.store);
        let cache_key = key.to_string();
        let outcome = self
            .in_flight
            .run(key.to_string(), move || {
                let call = network_call();
                async move {
                    let value = call.await?;
                    store.set(&cache_key, &value);
                    Ok(Arc::new(value) as AnyValue)
                }
            })
            .await;

        match outcome {
            Ok(any) => {
                let value = any.downcast::<V>().map_err(|_| {
                    FolioError::InternalError(format!(
                        "concurrent fetches of '{}' disagree on the value type",
                        key
                    ))
                })?;
                Ok(Fetched::new(value, FetchSource::Network))
            }
            Err(err) => match self.store.get::<V>(key) {
                Some(entry) => {
                    warn!(key, error = %err, stored_at = %entry.stored_at, "Refresh failed, serving stale value");
                    Ok(Fetched::new(Arc::new(entry.value), FetchSource::Stale(err)))
                }
                None => Err(err),
            },
        }
    }
}
