//! Budgeted cache of decoded RGB frames.
//!
//! Entries are keyed by (canonical file path, frame index) and accounted
//! in whole megabytes, so frames under a megabyte are effectively free.
//! Insertion evicts least-recently-used entries until the budget fits;
//! lookups promote. Concurrent misses for the same key coalesce onto a
//! single decode.

use parking_lot::{Condvar, Mutex};
use rawscope_core::{memory_budget, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Cache key: one frame of one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameKey {
    /// Canonical path of the source file.
    pub path: Arc<str>,
    /// Frame index within the file.
    pub index: u32,
}

struct CacheEntry {
    data: Arc<Vec<u8>>,
    cost: usize,
}

struct CacheInner {
    entries: HashMap<FrameKey, CacheEntry>,
    /// LRU order (most recently used last).
    lru_order: Vec<FrameKey>,
    cost_used: usize,
    max_cost: usize,
}

/// Shared LRU cache of decoded frames with a megabyte budget.
pub struct FrameCache {
    inner: Mutex<CacheInner>,
    pending: Mutex<HashSet<FrameKey>>,
    pending_changed: Condvar,
}

impl FrameCache {
    /// Create a cache with the given budget in whole megabytes.
    pub fn new(max_cost_mb: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                lru_order: Vec::new(),
                cost_used: 0,
                max_cost: max_cost_mb,
            }),
            pending: Mutex::new(HashSet::new()),
            pending_changed: Condvar::new(),
        }
    }

    /// The process-wide cache shared by all sources.
    pub fn shared() -> Arc<FrameCache> {
        static SHARED: OnceLock<Arc<FrameCache>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(FrameCache::new(memory_budget::FRAME_CACHE_MB)))
            .clone()
    }

    /// Look up a frame and promote it to most recently used.
    pub fn get(&self, key: &FrameKey) -> Option<Arc<Vec<u8>>> {
        let mut inner = self.inner.lock();
        if !inner.entries.contains_key(key) {
            return None;
        }
        inner.lru_order.retain(|k| k != key);
        inner.lru_order.push(key.clone());
        inner.entries.get(key).map(|e| e.data.clone())
    }

    /// Whether a frame is currently cached.
    pub fn contains(&self, key: &FrameKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Insert a frame, evicting least-recently-used entries until the
    /// budget fits. An entry whose own cost exceeds the whole budget is
    /// not cached at all.
    pub fn insert(&self, key: FrameKey, data: Arc<Vec<u8>>, cost: usize) {
        let mut inner = self.inner.lock();
        if cost > inner.max_cost {
            debug!(?key, cost, "frame exceeds cache budget, not cached");
            return;
        }

        if let Some(old) = inner.entries.remove(&key) {
            inner.cost_used -= old.cost;
            inner.lru_order.retain(|k| k != &key);
        }

        while inner.cost_used + cost > inner.max_cost && !inner.lru_order.is_empty() {
            let oldest = inner.lru_order.remove(0);
            if let Some(entry) = inner.entries.remove(&oldest) {
                inner.cost_used -= entry.cost;
                debug!(key = ?oldest, cost = entry.cost, "evicted frame");
            }
        }

        inner.cost_used += cost;
        inner.lru_order.push(key.clone());
        inner.entries.insert(key, CacheEntry { data, cost });
    }

    /// Fetch a frame, running `decode` on a miss. Concurrent misses for
    /// the same key wait for the one decode in flight instead of decoding
    /// again; a failed decode releases the key so a later caller retries.
    pub fn get_or_decode<F>(&self, key: FrameKey, cost: usize, decode: F) -> Result<Arc<Vec<u8>>>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        loop {
            if let Some(hit) = self.get(&key) {
                return Ok(hit);
            }
            let mut pending = self.pending.lock();
            if pending.insert(key.clone()) {
                break;
            }
            self.pending_changed.wait(&mut pending);
        }

        let _guard = PendingGuard { cache: self, key: &key };
        let data = Arc::new(decode()?);
        self.insert(key.clone(), data.clone(), cost);
        Ok(data)
    }

    /// Number of cached frames.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Megabytes currently accounted.
    pub fn cost_used(&self) -> usize {
        self.inner.lock().cost_used
    }

    /// Drop every cached frame.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.lru_order.clear();
        inner.cost_used = 0;
    }
}

struct PendingGuard<'a> {
    cache: &'a FrameCache,
    key: &'a FrameKey,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut pending = self.cache.pending.lock();
        pending.remove(self.key);
        self.cache.pending_changed.notify_all();
    }
}
