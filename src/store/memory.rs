use crate::core::cache::Cache;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct CacheValue<V> {
    value: V,
    expires_at: Option<Instant>,
}

struct Inner<K, V> {
    entries: HashMap<K, CacheValue<V>>,
    // Insertion order for FIFO eviction. Holds each live key exactly
    // once; remove and clear purge it alongside the map.
    order: VecDeque<K>,
}

/// In-memory cache bounded by a fixed capacity.
///
/// Entries past their TTL are treated as absent on read. When a put
/// would exceed capacity, the oldest inserted live entry is evicted.
pub struct MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<Inner<K, V>>>,
    capacity: usize,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            })),
            capacity: capacity.max(1),
        }
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let cache = self.inner.lock().await;
        if let Some(entry) = cache.entries.get(key) {
            if let Some(expiry) = entry.expires_at
                && expiry < Instant::now()
            {
                debug!("Cache entry expired for key: {:?}", key);
                return None;
            }
            debug!("Cache HIT for key: {:?}", key);
            return Some(entry.value.clone());
        }
        debug!("Cache MISS for key: {:?}", key);
        None
    }

    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.map(|duration| Instant::now() + duration);
        let cache_value = CacheValue { value, expires_at };

        let mut cache = self.inner.lock().await;
        let is_new = !cache.entries.contains_key(&key);
        if is_new {
            while cache.entries.len() >= self.capacity {
                match cache.order.pop_front() {
                    Some(oldest) => {
                        if cache.entries.remove(&oldest).is_some() {
                            debug!("Cache EVICT for key: {:?}", oldest);
                        }
                    }
                    None => break,
                }
            }
            cache.order.push_back(key.clone());
        }
        debug!("Cache PUT for key: {:?}", key);
        cache.entries.insert(key, cache_value);
    }

    async fn remove(&self, key: &K) {
        let mut cache = self.inner.lock().await;
        cache.entries.remove(key);
        // Purge the queue too, or a later re-put of the same key would
        // leave a duplicate and mis-target the next eviction.
        cache.order.retain(|k| k != key);
        debug!("Cache REMOVE for key: {:?}", key);
    }

    async fn clear(&self) {
        let mut cache = self.inner.lock().await;
        cache.entries.clear();
        cache.order.clear();
        debug!("Cache CLEAR");
    }
}
