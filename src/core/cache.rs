//! Cache abstraction shared by the data providers.

use async_trait::async_trait;
use std::time::Duration;

/// Read-through, best-effort cache. A missing entry never blocks
/// execution, it only forces recomputation.
#[async_trait]
pub trait Cache<K, V>: Send + Sync {
    async fn get(&self, key: &K) -> Option<V>;

    /// Stores a value. `ttl` of `None` keeps the entry until it is
    /// evicted or explicitly removed.
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);

    /// Invalidates a single entry.
    async fn remove(&self, key: &K);

    /// Invalidates everything.
    async fn clear(&self);
}
