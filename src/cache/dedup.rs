//! Coalescing of identical outbound requests.
//!
//! Callers that ask for the same key within the TTL window share one in-flight
//! (or recently settled) request instead of each going to the network.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::debug;

/// Default time-to-live for coalesced requests.
pub const DEFAULT_TTL: Duration = Duration::from_millis(2000);

/// A shareable handle to a request's eventual result.
pub type RequestHandle<T> = Shared<BoxFuture<'static, T>>;

struct CacheEntry<T: Clone> {
    handle: RequestHandle<T>,
    created_at: Instant,
    token: u64,
}

struct DedupState<T: Clone> {
    entries: HashMap<String, CacheEntry<T>>,
    next_token: u64,
}

/// Request cache keyed by URL and request options.
///
/// Cloning yields another handle to the same cache.
pub struct RequestDeduplicator<T: Clone> {
    state: Arc<Mutex<DedupState<T>>>,
}

impl<T: Clone> Clone for RequestDeduplicator<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DedupState {
                entries: HashMap::new(),
                next_token: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DedupState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached handle for `key` if it is younger than `ttl`,
    /// otherwise start `perform` and cache its handle.
    ///
    /// `perform` runs with the cache unlocked, so it may call back into this
    /// deduplicator. Failures are cached like successes; nothing is retried here.
    pub fn fetch_deduped<F, Fut>(&self, key: &str, perform: F, ttl: Duration) -> RequestHandle<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        if let Some(handle) = self.fresh(key, ttl) {
            debug!(key, "Using cached request");
            return handle;
        }

        let handle = perform().boxed().shared();

        let token = {
            let mut state = self.lock();
            let now = Instant::now();

            // Another caller may have filled the slot while `perform` ran.
            if let Some(entry) = state.entries.get(key) {
                if now.duration_since(entry.created_at) < ttl {
                    debug!(key, "Using cached request");
                    return entry.handle.clone();
                }
            }

            debug!(key, "Making new request");
            let token = state.next_token;
            state.next_token += 1;
            state.entries.insert(
                key.to_string(),
                CacheEntry {
                    handle: handle.clone(),
                    created_at: now,
                    token,
                },
            );
            token
        };

        self.schedule_eviction(key.to_string(), token, handle.clone(), ttl);
        handle
    }

    fn fresh(&self, key: &str, ttl: Duration) -> Option<RequestHandle<T>> {
        let state = self.lock();
        let entry = state.entries.get(key)?;
        (Instant::now().duration_since(entry.created_at) < ttl).then(|| entry.handle.clone())
    }

    /// Drive the request to completion, then drop its entry `ttl` later.
    fn schedule_eviction(&self, key: String, token: u64, handle: RequestHandle<T>, ttl: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // Without a runtime the entry is only replaced lazily on its next lookup.
            return;
        };

        let state: Weak<Mutex<DedupState<T>>> = Arc::downgrade(&self.state);
        runtime.spawn(async move {
            let _ = handle.await;
            tokio::time::sleep(ttl).await;

            if let Some(shared) = state.upgrade() {
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if state.entries.get(&key).is_some_and(|e| e.token == token) {
                    state.entries.remove(&key);
                }
            }
        });
    }

    /// Forget every cached request.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Forget every cached request whose key starts with `prefix`.
    pub fn clear_prefix(&self, prefix: &str) {
        self.lock().entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
