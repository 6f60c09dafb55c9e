//! Fixed-capacity LRU cache, used by the host side of the stack.
//!
//! Capacity is a compile-time parameter; eviction of the least recently
//! used entry happens atomically with the insertion that exceeds it.
//! Single-consumer: the interpreter itself never touches this.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

pub struct FixedLruCache<const N: usize, K: Hash + Eq, V> {
    entries: LruCache<K, V>,
}

impl<const N: usize, K: Hash + Eq, V> FixedLruCache<N, K, V> {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(N).unwrap_or(NonZeroUsize::MIN);
        Self { entries: LruCache::new(capacity) }
    }

    /// Look up `key`; a hit marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Insert or overwrite `key`, marking it most recently used, and
    /// return the stored value.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> V
    where
        V: Clone,
    {
        self.entries.put(key, value.clone());
        value
    }

    /// Return the cached value for `key`, computing and inserting it via
    /// `init` on a miss. `init` runs exactly once on a miss and never on
    /// a hit.
    pub fn get_or_insert(&mut self, key: K, init: impl FnOnce() -> V) -> V
    where
        V: Clone,
    {
        self.entries.get_or_insert(key, init).clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize, K: Hash + Eq, V> Default for FixedLruCache<N, K, V> {
    fn default() -> Self {
        Self::new()
    }
}
