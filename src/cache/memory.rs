// In-memory stores for the cache system

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use super::CacheEntry;

/// Process-lifetime key → entry map
///
/// Does not interpret payloads or judge freshness; that is the façade's job.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry<Value>> {
        self.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, entry: CacheEntry<Value>) {
        self.write().insert(key.into(), entry);
    }

    pub fn delete(&self, key: &str) {
        self.write().remove(key);
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Poisoned locks are recovered.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<Value>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<Value>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

struct Slot<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
    generation: u64,
}

struct ExpiringInner<V> {
    slots: HashMap<String, Slot<V>>,
    next_generation: u64,
}

/// Memory-only cache where every entry carries its own TTL
///
/// Each `set` schedules a timer that deletes the entry once its TTL elapses.
/// A later `set` on the same key supersedes the earlier timer.
pub struct ExpiringStore<V> {
    inner: Arc<Mutex<ExpiringInner<V>>>,
}

impl<V> Clone for ExpiringStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> std::fmt::Debug for ExpiringStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("len", &self.len())
            .finish()
    }
}

impl<V> Default for ExpiringStore<V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ExpiringInner {
                slots: HashMap::new(),
                next_generation: 0,
            })),
        }
    }
}

impl<V> ExpiringStore<V>
where
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value if present and younger than its TTL
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.lock();
        let expired = match inner.slots.get(key) {
            None => return None,
            Some(slot) => slot.inserted_at.elapsed() >= slot.ttl,
        };

        if expired {
            inner.slots.remove(key);
            None
        } else {
            inner.slots.get(key).map(|slot| slot.value.clone())
        }
    }

    /// Stores a value and schedules its removal after `ttl`
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let generation = {
            let mut inner = self.lock();
            inner.next_generation += 1;
            let generation = inner.next_generation;
            inner.slots.insert(
                key.clone(),
                Slot {
                    value,
                    inserted_at: Instant::now(),
                    ttl,
                    generation,
                },
            );
            generation
        };

        // Outside a runtime the entry still expires lazily in `get`.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
                if inner
                    .slots
                    .get(&key)
                    .is_some_and(|slot| slot.generation == generation)
                {
                    inner.slots.remove(&key);
                }
            });
        }
    }

    pub fn delete(&self, key: &str) {
        self.lock().slots.remove(key);
    }

    pub fn clear(&self) {
        self.lock().slots.clear();
    }
}

impl<V> ExpiringStore<V> {
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, ExpiringInner<V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_basic_operations() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("home_data", CacheEntry::new(json!({"count": 1}), 100));
        store.set("topics", CacheEntry::new(json!({"topics": []}), 200));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("home_data").unwrap().timestamp, 100);

        store.set("home_data", CacheEntry::new(json!({"count": 2}), 300));
        assert_eq!(store.get("home_data").unwrap().data["count"], 2);

        store.delete("home_data");
        assert!(store.get("home_data").is_none());

        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiring_store_timer_removes_entry() {
        let store = ExpiringStore::new();
        store.set("kline_a", vec![1, 2, 3], Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(store.get("kline_a"), Some(vec![1, 2, 3]));

        tokio::time::sleep(Duration::from_secs(2)).await;
        // Let the expiry task run
        tokio::task::yield_now().await;
        assert!(store.is_empty());
        assert_eq!(store.get("kline_a"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiring_store_rewrite_survives_old_timer() {
        let store = ExpiringStore::new();
        store.set("kline_b", "mock", Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(5)).await;
        store.set("kline_b", "real", Duration::from_secs(300));

        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.get("kline_b"), Some("real"));
    }

    #[test]
    fn test_expiring_store_without_runtime_expires_lazily() {
        let store = ExpiringStore::new();
        store.set("k", 1u8, Duration::ZERO);
        assert_eq!(store.get("k"), None);
        assert!(store.is_empty());
    }
}
