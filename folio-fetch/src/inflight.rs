//! Request coalescing: at most one outstanding fetch per key.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;

/// A registered fetch that any number of callers can await.
type Pending<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// Coalesces concurrent requests for the same key into one operation.
///
/// The first caller for a key runs the producer; every caller that arrives
/// before it settles awaits the same future and receives a clone of the same
/// outcome. The key is deregistered as part of settling, before any waiter
/// sees the result, so the next call after settlement starts afresh.
///
/// There is no timeout and no retry: a producer that never completes keeps
/// its waiters waiting. A fetch whose callers have all gone away stays
/// registered and is driven to completion by the next caller for that key.
pub struct InFlight<K, T, E> {
    pending: Arc<Mutex<HashMap<K, Pending<T, E>>>>,
}

impl<K, T, E> InFlight<K, T, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates an empty coordinator.
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs `producer` for `key` unless a fetch for `key` is already pending,
    /// in which case its outcome is awaited instead.
    ///
    /// `producer` is called at most once, synchronously, while the registry
    /// is locked; it must only build the future, not call back into this
    /// coordinator.
    pub async fn run<F, Fut>(&self, key: K, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let shared = {
            let mut pending = self.pending.lock();
            match pending.get(&key) {
                Some(existing) => {
                    debug!(?key, "Joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    debug!(?key, "Starting fetch");
                    let shared = Self::settle_then_deregister(
                        key.clone(),
                        Arc::clone(&self.pending),
                        producer(),
                    );
                    pending.insert(key, shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    fn settle_then_deregister<Fut>(
        key: K,
        registry: Arc<Mutex<HashMap<K, Pending<T, E>>>>,
        fut: Fut,
    ) -> Pending<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        async move {
            let outcome = AssertUnwindSafe(fut).catch_unwind().await;
            registry.lock().remove(&key);
            match outcome {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        .boxed()
        .shared()
    }

    /// Whether a fetch for `key` is currently outstanding.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.pending.lock().contains_key(key)
    }

    /// Number of outstanding fetches.
    pub fn in_flight_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl<K, T, E> Default for InFlight<K, T, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
