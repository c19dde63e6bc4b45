//! In-process TTL cache of parsed indexes.
//!
//! Entries are keyed by [`IndexScope::cache_key`]. A hit younger than the
//! TTL never touches disk; anything older falls through to the
//! [`TagIndexStore`]. Writes go through [`IndexCache::write_through`],
//! which persists first and then refreshes the entry, so a reader right
//! after a writer sees the new index regardless of TTL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use membank_core::defaults::GLOBAL_CACHE_KEY;
use membank_core::{IndexScope, Result};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::model::TagIndex;
use crate::store::TagIndexStore;

struct CachedIndex {
    index: Arc<TagIndex>,
    cached_at: Instant,
}

/// Identifies what a disk read may be filled over: the invalidate-all
/// epoch and the key's own counter.
type Generation = (u64, u64);

#[derive(Default)]
struct Slots {
    entries: HashMap<String, CachedIndex>,
    /// Bumped by every put and invalidation of a key. Never pruned.
    generations: HashMap<String, u64>,
    epoch: u64,
}

impl Slots {
    fn generation(&self, key: &str) -> Generation {
        (self.epoch, self.generations.get(key).copied().unwrap_or(0))
    }

    fn bump(&mut self, key: &str) {
        *self.generations.entry(key.to_string()).or_default() += 1;
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct IndexCache {
    store: Arc<TagIndexStore>,
    ttl: Duration,
    slots: RwLock<Slots>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl IndexCache {
    /// Cache in front of `store` using the store's configured TTL.
    pub fn new(store: Arc<TagIndexStore>) -> Self {
        let ttl = store.config().index_cache_ttl;
        Self::with_ttl(store, ttl)
    }

    pub fn with_ttl(store: Arc<TagIndexStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            slots: RwLock::new(Slots::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &TagIndexStore {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current index for `scope`, from memory when fresh, else from disk.
    ///
    /// A missing or malformed index file yields `Ok(None)` and is not cached.
    /// A disk read never replaces an entry put while the read was in flight.
    pub async fn get(&self, scope: &IndexScope) -> Result<Option<Arc<TagIndex>>> {
        let key = scope.cache_key();

        let observed = {
            let slots = self.slots.read().await;
            if let Some(cached) = slots.entries.get(&key) {
                if cached.cached_at.elapsed() < self.ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(subsystem = "index", component = "index_cache", scope = %scope, "Cache hit");
                    return Ok(Some(Arc::clone(&cached.index)));
                }
            }
            slots.generation(&key)
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(subsystem = "index", component = "index_cache", scope = %scope, "Cache miss");

        let loaded = self.store.read(scope).await?;
        Ok(self.fill(scope, &key, observed, loaded).await)
    }

    async fn fill(
        &self,
        scope: &IndexScope,
        key: &str,
        observed: Generation,
        loaded: Option<TagIndex>,
    ) -> Option<Arc<TagIndex>> {
        let mut slots = self.slots.write().await;

        if slots.generation(key) != observed {
            // The read may predate a put or invalidation made meanwhile
            debug!(
                subsystem = "index",
                component = "index_cache",
                scope = %scope,
                "Discarding disk read superseded by a newer entry"
            );
            return match slots.entries.get(key) {
                Some(cached) => Some(Arc::clone(&cached.index)),
                None => loaded.map(Arc::new),
            };
        }

        match loaded {
            Some(index) => {
                let index = Arc::new(index);
                slots.entries.insert(
                    key.to_string(),
                    CachedIndex {
                        index: Arc::clone(&index),
                        cached_at: Instant::now(),
                    },
                );
                Some(index)
            }
            None => {
                slots.entries.remove(key);
                None
            }
        }
    }

    /// Overwrite the entry for `scope` and restart its TTL.
    pub async fn put(&self, scope: &IndexScope, index: TagIndex) -> Arc<TagIndex> {
        let key = scope.cache_key();
        let index = Arc::new(index);
        let mut slots = self.slots.write().await;
        slots.bump(&key);
        slots.entries.insert(
            key,
            CachedIndex {
                index: Arc::clone(&index),
                cached_at: Instant::now(),
            },
        );
        index
    }

    /// Persist `index` and then cache it.
    ///
    /// If the write fails the cached entry is left as it was.
    pub async fn write_through(&self, scope: &IndexScope, index: TagIndex) -> Result<Arc<TagIndex>> {
        self.store.write(scope, &index).await?;
        Ok(self.put(scope, index).await)
    }

    /// Drop one scope's entry. `None` drops the global entry.
    pub async fn invalidate(&self, scope: Option<&IndexScope>) {
        let key = scope
            .map(IndexScope::cache_key)
            .unwrap_or_else(|| GLOBAL_CACHE_KEY.to_string());
        let mut slots = self.slots.write().await;
        slots.bump(&key);
        if slots.entries.remove(&key).is_some() {
            debug!(subsystem = "index", component = "index_cache", key = %key, "Cache entry invalidated");
        }
    }

    pub async fn invalidate_all(&self) {
        let mut slots = self.slots.write().await;
        let count = slots.entries.len();
        slots.entries.clear();
        slots.epoch += 1;
        debug!(subsystem = "index", component = "index_cache", count, "Cache cleared");
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.slots.read().await.entries.len(),
        }
    }
}
