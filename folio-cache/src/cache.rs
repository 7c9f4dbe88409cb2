//! Persistent cache store with per-entry timestamps.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use folio_core::constants::CACHE_KEY_PREFIX;
use folio_core::traits::{Clock, Storage, SystemClock};

/// A cached value together with the time it was stored.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry<V> {
    /// Cache key (without the storage prefix)
    pub key: String,
    /// Cached value
    pub value: V,
    /// When the value was written
    pub stored_at: DateTime<Utc>,
}

/// On-disk shape of an entry. Value and timestamp travel in one record so a
/// reader never sees one without the other.
#[derive(Deserialize)]
struct Record<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RecordRef<'a, V: ?Sized> {
    value: &'a V,
    stored_at: DateTime<Utc>,
}

/// Best-effort cache over a [`Storage`] backend.
///
/// Nothing here returns an error: unreadable or malformed entries read as
/// absent, and failed writes are logged and dropped. Correctness never
/// depends on the cache.
pub struct CacheStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Creates a store over `storage` using the system clock.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    /// Creates a store with an explicit clock.
    pub fn with_clock(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Returns the backing storage.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Returns the current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn record_key(key: &str) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, key)
    }

    fn read_record<V: DeserializeOwned>(&self, key: &str) -> Option<Record<V>> {
        let raw = match self.storage.get_item(&Self::record_key(key)) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(key, error = %e, "Ignoring malformed cache entry");
                None
            }
        }
    }

    /// Gets the entry for `key`, whatever its age.
    ///
    /// Returns `None` if nothing is stored, the record is malformed, or it
    /// does not deserialize as `V`.
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<V>> {
        self.read_record::<V>(key).map(|r| CacheEntry {
            key: key.to_string(),
            value: r.value,
            stored_at: r.stored_at,
        })
    }

    /// Stores `value` under `key`, stamped with the current time.
    ///
    /// Returns whether the write reached storage.
    pub fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> bool {
        let record = RecordRef {
            value,
            stored_at: self.clock.now(),
        };

        let serialized = match serde_json::to_string(&record) {
            Ok(s) => s,
            Err(e) => {
                warn!(key, error = %e, "Cache value not serializable, skipping");
                return false;
            }
        };

        match self.storage.set_item(&Self::record_key(key), &serialized) {
            Ok(()) => {
                debug!(key, bytes = serialized.len(), "Cached");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Cache write failed");
                false
            }
        }
    }

    /// Age of the entry for `key`.
    ///
    /// An entry stamped in the future (clock moved backwards) has age zero.
    pub fn age(&self, key: &str) -> Option<Duration> {
        let record = self.read_record::<IgnoredAny>(key)?;
        let age = self.clock.now() - record.stored_at;
        Some(age.to_std().unwrap_or(Duration::ZERO))
    }

    /// True iff an entry exists and is younger than `ttl`.
    pub fn is_valid(&self, key: &str, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }
        self.age(key).is_some_and(|age| age < ttl)
    }

    /// Removes the entry for `key`.
    pub fn invalidate(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(&Self::record_key(key)) {
            warn!(key, error = %e, "Cache invalidation failed");
        }
    }

    /// Lists the keys that currently have an entry.
    pub fn keys(&self) -> Vec<String> {
        match self.storage.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(CACHE_KEY_PREFIX).map(str::to_string))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Listing cache keys failed");
                Vec::new()
            }
        }
    }

    /// Removes every cache entry, leaving non-cache storage keys alone.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let keys = self.keys();
        for key in &keys {
            self.invalidate(key);
        }
        keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use folio_core::traits::ManualClock;
    use proptest::prelude::*;

    fn store_with_clock() -> (CacheStore, Arc<ManualClock>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::default());
        let store = CacheStore::with_clock(storage.clone(), clock.clone());
        (store, clock, storage)
    }

    #[test]
    fn test_set_get() {
        let (store, _, _) = store_with_clock();
        assert!(store.set("articles", &vec!["a1", "a2"]));

        let entry = store.get::<Vec<String>>("articles").unwrap();
        assert_eq!(entry.key, "articles");
        assert_eq!(entry.value, vec!["a1".to_string(), "a2".to_string()]);
        assert_eq!(entry.stored_at, store.now());
    }

    #[test]
    fn test_miss() {
        let (store, _, _) = store_with_clock();
        assert!(store.get::<String>("user_role").is_none());
        assert!(!store.is_valid("user_role", Duration::from_secs(60)));
        assert!(store.age("user_role").is_none());
    }

    #[test]
    fn test_expiry() {
        let (store, clock, _) = store_with_clock();
        store.set("user_role", "admin");

        clock.advance(Duration::from_secs(29 * 60));
        assert!(store.is_valid("user_role", Duration::from_secs(30 * 60)));

        clock.advance(Duration::from_secs(60));
        assert!(!store.is_valid("user_role", Duration::from_secs(30 * 60)));
        // Expired entries are still readable for stale fallback
        assert_eq!(store.get::<String>("user_role").unwrap().value, "admin");
    }

    #[test]
    fn test_zero_ttl_never_valid() {
        let (store, _, _) = store_with_clock();
        store.set("articles", &Vec::<String>::new());
        assert!(!store.is_valid("articles", Duration::ZERO));
    }

    #[test]
    fn test_future_timestamp_has_zero_age() {
        let (store, clock, _) = store_with_clock();
        store.set("user_avatar", "a.png");
        clock.set(store.now() - chrono::Duration::minutes(5));
        assert_eq!(store.age("user_avatar"), Some(Duration::ZERO));
    }

    #[test]
    fn test_malformed_entry_is_absent() {
        let (store, _, storage) = store_with_clock();
        storage.set_item("cache:articles", "{not json").unwrap();
        assert!(store.get::<serde_json::Value>("articles").is_none());
        assert!(!store.is_valid("articles", Duration::from_secs(60)));
    }

    #[test]
    fn test_type_mismatch_is_absent() {
        let (store, _, _) = store_with_clock();
        store.set("user_role", "admin");
        assert!(store.get::<Vec<u32>>("user_role").is_none());
    }

    #[test]
    fn test_single_record_layout() {
        let (store, _, storage) = store_with_clock();
        store.set("user_role", "admin");

        let raw = storage.get_item("cache:user_role").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["value"], "admin");
        assert!(json["stored_at"].is_string());
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let storage = Arc::new(MemoryStorage::with_quota(16));
        let store = CacheStore::new(storage.clone());

        assert!(!store.set("articles", &vec!["a very long article title"; 8]));
        assert!(store.get::<Vec<String>>("articles").is_none());
    }

    #[test]
    fn test_clear_keeps_other_keys() {
        let (store, _, storage) = store_with_clock();
        storage.set_item("idToken", "tok").unwrap();
        store.set("articles", &Vec::<String>::new());
        store.set("user_role", "user");

        assert_eq!(store.clear(), 2);
        assert!(store.keys().is_empty());
        assert_eq!(storage.get_item("idToken").unwrap().as_deref(), Some("tok"));
    }

    proptest! {
        #[test]
        fn prop_fresh_entry_is_valid(key in "[a-z_]{1,16}", value in any::<i64>(), ttl_ms in 1u64..10_000_000) {
            let (store, _, _) = store_with_clock();
            store.set(&key, &value);
            prop_assert!(store.is_valid(&key, Duration::from_millis(ttl_ms)));
        }

        #[test]
        fn prop_invalidate_removes(key in "[a-z_]{1,16}", value in ".*") {
            let (store, _, _) = store_with_clock();
            store.set(&key, &value);
            store.invalidate(&key);
            prop_assert!(store.get::<String>(&key).is_none());
        }
    }
}
