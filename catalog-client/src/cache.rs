//! Tag-invalidated query cache
//!
//! Each cached query is stored under a key together with the tags it
//! provides. A query is fetched at most once at a time: callers that arrive
//! while it is in flight join the same shared future. Successful results are
//! served from memory until one of the entry's tags is invalidated; failures
//! are never cached.
//!
//! Invalidation drops every entry carrying the tag (finished or in flight)
//! and publishes the tag on a broadcast channel so mounted views can
//! re-fetch. An in-flight query that lost its entry still
//! resolves for the callers awaiting it, but its result is not stored.

use crate::ClientResult;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Invalidation channel capacity
const INVALIDATION_CAPACITY: usize = 16;

/// Cache invalidation tag
///
/// A single tag covers the whole product collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Products,
}

type SharedQuery<T> = Shared<BoxFuture<'static, ClientResult<Arc<T>>>>;

enum Slot<T> {
    InFlight(SharedQuery<T>),
    Ready(Arc<T>),
}

struct CacheEntry<T> {
    /// Distinguishes this entry from a later one under the same key
    generation: u64,
    tags: Vec<CacheTag>,
    slot: Slot<T>,
}

/// Query cache with request deduplication and tag invalidation
pub struct QueryCache<T> {
    entries: Arc<DashMap<String, CacheEntry<T>>>,
    generation: AtomicU64,
    invalidations: broadcast::Sender<CacheTag>,
}

impl<T: Send + Sync + 'static> QueryCache<T> {
    pub fn new() -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self {
            entries: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            invalidations,
        }
    }

    /// Resolve `key` from cache, joining an in-flight fetch or starting one
    ///
    /// `fetch` is only called when neither a cached value nor an in-flight
    /// request exists for `key`.
    pub async fn query<F, Fut>(&self, key: &str, tags: &[CacheTag], fetch: F) -> ClientResult<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>> + Send + 'static,
    {
        let query = match self.entries.entry(key.to_string()) {
            Entry::Occupied(entry) => match &entry.get().slot {
                Slot::Ready(value) => {
                    tracing::trace!(key, "Query cache hit");
                    return Ok(Arc::clone(value));
                }
                Slot::InFlight(query) => {
                    tracing::trace!(key, "Joining in-flight query");
                    query.clone()
                }
            },
            Entry::Vacant(entry) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, generation, "Query cache miss, fetching");

                let entries = Arc::clone(&self.entries);
                let owned_key = key.to_string();
                let request = fetch();
                let query = async move {
                    let result = request.await.map(Arc::new);
                    settle(&entries, &owned_key, generation, &result);
                    result
                }
                .boxed()
                .shared();

                entry.insert(CacheEntry {
                    generation,
                    tags: tags.to_vec(),
                    slot: Slot::InFlight(query.clone()),
                });
                query
            }
        };

        query.await
    }

    /// Cached value for `key`, if a successful result is stored
    pub fn cached(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).and_then(|entry| match &entry.slot {
            Slot::Ready(value) => Some(Arc::clone(value)),
            Slot::InFlight(_) => None,
        })
    }

    /// Whether a fetch for `key` is currently in flight
    pub fn is_fetching(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| matches!(entry.slot, Slot::InFlight(_)))
    }

    /// Drop every entry providing `tag` and notify subscribers
    pub fn invalidate(&self, tag: CacheTag) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.tags.contains(&tag));
        tracing::debug!(
            ?tag,
            dropped = before.saturating_sub(self.entries.len()),
            "Cache tag invalidated"
        );
        // No subscribers is fine
        let _ = self.invalidations.send(tag);
    }

    /// Receive every invalidated tag from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CacheTag> {
        self.invalidations.subscribe()
    }
}

impl<T: Send + Sync + 'static> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Store the outcome of the fetch that owns `generation`
///
/// Does nothing if the entry was invalidated (or replaced) meanwhile.
fn settle<T>(
    entries: &DashMap<String, CacheEntry<T>>,
    key: &str,
    generation: u64,
    result: &ClientResult<Arc<T>>,
) {
    match result {
        Ok(value) => {
            if let Some(mut entry) = entries.get_mut(key)
                && entry.generation == generation
            {
                entry.slot = Slot::Ready(Arc::clone(value));
            }
        }
        Err(err) => {
            tracing::debug!(key, error = %err, "Query failed, not caching");
            entries.remove_if(key, |_, entry| entry.generation == generation);
        }
    }
}
