//! TTL cache with O(1) LRU eviction, and the market-metadata cache built on it.
//!
//! Grounded on `original_source/polymarket/utils/cache.py` (`TTLCache`,
//! `MarketMetadataCache`). The Python original uses an `OrderedDict` for O(1)
//! move-to-end/pop-oldest; here a `HashMap` keyed by cache key plus an
//! insertion-ordered `VecDeque` of keys gives the same behavior without
//! pulling in an extra crate.

use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A bounded, TTL-expiring, LRU-evicting cache.
///
/// Every mutation touches `order`, which tracks recency for eviction; reads
/// via [`TTLCache::get`] count as a touch too, matching the Python
/// `OrderedDict.move_to_end` semantics the original uses.
pub struct TTLCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    ttl: Duration,
    max_size: usize,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    order: VecDeque<K>,
}

impl<K, V> TTLCache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            ttl,
            max_size,
        }
    }

    fn touch(order: &mut VecDeque<K>, key: &K) {
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        order.push_back(key.clone());
    }

    /// Fetch a live (non-expired) value, touching its recency on hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.lock().expect("TTLCache poisoned");
        let expired = match guard.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            guard.entries.remove(key);
            if let Some(pos) = guard.order.iter().position(|k| k == key) {
                guard.order.remove(pos);
            }
            return None;
        }
        let value = guard.entries.get(key).map(|e| e.value.clone());
        if value.is_some() {
            Self::touch(&mut guard.order, key);
        }
        value
    }

    /// Insert or overwrite a value, evicting the least-recently-used entry
    /// if the cache is at capacity.
    pub fn insert(&self, key: K, value: V) {
        let mut guard = self.inner.lock().expect("TTLCache poisoned");
        let is_new = !guard.entries.contains_key(&key);
        guard.entries.insert(
            key.clone(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
        Self::touch(&mut guard.order, &key);
        if is_new && guard.order.len() > self.max_size {
            if let Some(oldest) = guard.order.pop_front() {
                guard.entries.remove(&oldest);
            }
        }
    }

    pub fn remove(&self, key: &K) {
        let mut guard = self.inner.lock().expect("TTLCache poisoned");
        guard.entries.remove(key);
        if let Some(pos) = guard.order.iter().position(|k| k == key) {
            guard.order.remove(pos);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("TTLCache poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Double-checked-locking fetch-or-compute: return a cached hit, or run
    /// `fetch` and cache its result. `fetch` runs outside the lock so a slow
    /// upstream call can't block other cache users.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}

/// Per-token market metadata worth caching: tick size, fee rate, neg-risk flag.
/// These change rarely (market creation / resolution) so a 5-minute TTL,
/// matching the Python original, is generous.
#[derive(Debug, Clone)]
pub struct MarketMetadata {
    pub tick_size: Decimal,
    pub neg_risk: bool,
    pub fee_rate_bps: u32,
}

pub const MARKET_METADATA_TTL: Duration = Duration::from_secs(5 * 60);
pub const MARKET_METADATA_CACHE_SIZE: usize = 10_000;

pub struct MarketMetadataCache {
    inner: TTLCache<String, MarketMetadata>,
}

impl Default for MarketMetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketMetadataCache {
    pub fn new() -> Self {
        Self {
            inner: TTLCache::new(MARKET_METADATA_TTL, MARKET_METADATA_CACHE_SIZE),
        }
    }

    pub fn get(&self, token_id: &str) -> Option<MarketMetadata> {
        self.inner.get(&token_id.to_string())
    }

    pub fn insert(&self, token_id: &str, metadata: MarketMetadata) {
        self.inner.insert(token_id.to_string(), metadata);
    }

    pub async fn get_or_fetch<F, Fut>(
        &self,
        token_id: &str,
        fetch: F,
    ) -> crate::errors::Result<MarketMetadata>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = crate::errors::Result<MarketMetadata>>,
    {
        self.inner.get_or_fetch(token_id.to_string(), fetch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn lru_eviction_order() {
        let cache: TTLCache<&str, u32> = TTLCache::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 2); // evicts "a"
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(2));
    }

    #[test]
    fn ttl_expiry() {
        let cache: TTLCache<&str, u32> = TTLCache::new(Duration::from_millis(10), 10);
        cache.insert("a", 1);
        sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"a"), None);
    }
}
