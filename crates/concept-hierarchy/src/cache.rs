//! Hierarchy cache.
//!
//! Holds built and merged hierarchies behind `Arc` so repeated requests for
//! the same key return the very same instance. The cache lock is held while
//! a missing entry is built, which keeps builds at most once per key under
//! concurrent callers. Failed builds leave the cache untouched.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::graph::ConceptHierarchy;

/// Configuration for [`HierarchyCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached hierarchies. `None` keeps every entry until
    /// [`HierarchyCache::clear`] is called.
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    /// Unbounded cache.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Cache evicting least recently used entries beyond `max_entries`.
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
        }
    }
}

/// Counters describing cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently cached.
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that ran a builder.
    pub misses: u64,
    /// Entries dropped to respect the bound.
    pub evictions: u64,
}

struct Inner {
    entries: LruCache<String, Arc<ConceptHierarchy>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Keyed store of shared hierarchies.
pub struct HierarchyCache {
    inner: Mutex<Inner>,
    max_entries: Option<usize>,
}

impl HierarchyCache {
    /// Creates a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        let entries = config
            .max_entries
            .and_then(|n| NonZeroUsize::new(n.max(1)))
            .map(LruCache::new)
            .unwrap_or_else(LruCache::unbounded);
        Self {
            inner: Mutex::new(Inner {
                entries,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            max_entries: config.max_entries,
        }
    }

    /// Returns the cached hierarchy for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<ConceptHierarchy>> {
        let mut inner = self.inner.lock();
        let found = inner.entries.get(key).cloned();
        if found.is_some() {
            inner.hits += 1;
        }
        found
    }

    /// Returns true if `key` is cached, without touching recency.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains(key)
    }

    /// Returns the cached hierarchy for `key`, building it on a miss.
    ///
    /// The builder runs under the cache lock and must not call back into
    /// this cache. An `Err` from the builder is returned and nothing is
    /// cached.
    pub fn get_or_build<F, E>(&self, key: &str, build: F) -> Result<Arc<ConceptHierarchy>, E>
    where
        F: FnOnce() -> Result<ConceptHierarchy, E>,
    {
        let mut inner = self.inner.lock();
        if let Some(hit) = inner.entries.get(key).cloned() {
            inner.hits += 1;
            debug!(key, "hierarchy cache hit");
            return Ok(hit);
        }

        inner.misses += 1;
        let hierarchy = Arc::new(build()?);
        if let Some((evicted, _)) = inner.entries.push(key.to_string(), Arc::clone(&hierarchy)) {
            inner.evictions += 1;
            debug!(key, evicted = %evicted, "evicted hierarchy");
        }
        debug!(key, entries = inner.entries.len(), "cached hierarchy");
        Ok(hierarchy)
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        debug!(dropped, "cleared hierarchy cache");
    }

    /// Number of cached hierarchies.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }
}

impl Default for HierarchyCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for HierarchyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("HierarchyCache")
            .field("entries", &stats.entries)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
