//! In-memory TTL cache for aggregated results.
//!
//! Process-local only: every instance of the service keeps its own entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe TTL cache keyed by string.
#[derive(Debug)]
pub struct TtlCache<V> {
    inner: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
    default_ttl: Duration,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V: Clone + Send + Sync> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Value for `key` if present and not yet expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let map = self.inner.read().await;
        map.get(key).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Store `value`; `ttl` overrides the default. No-op when the effective TTL is zero.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            return;
        }
        let expires_at = Instant::now() + ttl;
        self.inner
            .write()
            .await
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        self.inner.write().await.remove(key).is_some()
    }

    /// Remove every key starting with `prefix`; returns how many were removed.
    pub async fn delete_prefix(&self, prefix: &str) -> usize {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|k, _| !k.starts_with(prefix));
        before - map.len()
    }

    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.inner.write().await.retain(|_, e| e.expires_at > now);
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
