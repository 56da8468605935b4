//! Cache façade composing the memory and file stores
//!
//! Provides a `CacheManager` with read-through / write-through semantics:
//! reads try memory, then disk (promoting fresh disk hits into memory); writes
//! always go to both. Freshness is `now - timestamp < ttl(key)`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::file::FileStore;
use super::memory::MemoryStore;
use super::ttl::{CacheCategory, TtlPolicy};
use super::CacheEntry;

/// Result of an any-age cache read, including metadata about freshness
#[derive(Debug)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the entry is older than its TTL
    pub is_expired: bool,
}

/// Validity and age of one category, as reported by [`CacheManager::status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatus {
    /// Whether the in-memory entry is currently fresh
    pub valid: bool,
    /// Seconds since the entry was written, or -1 if there is no entry
    pub age: i64,
}

impl CacheStatus {
    pub const ABSENT: CacheStatus = CacheStatus {
        valid: false,
        age: -1,
    };
}

/// Two-tier response cache
///
/// Built once at startup and shared (`Arc<CacheManager>`) by the request path
/// and the background refresher. Never returns storage errors: a failing disk
/// or a corrupt file is logged and treated as a miss.
#[derive(Debug)]
pub struct CacheManager {
    memory: MemoryStore,
    files: FileStore,
    ttl: TtlPolicy,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    /// Creates a CacheManager storing files under `cache_dir`, using the system clock
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: TtlPolicy) -> Self {
        Self::with_clock(cache_dir, ttl, Arc::new(SystemClock))
    }

    /// Creates a CacheManager with a custom clock
    ///
    /// Useful for testing TTL boundaries without waiting.
    pub fn with_clock(cache_dir: impl Into<PathBuf>, ttl: TtlPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            memory: MemoryStore::new(),
            files: FileStore::new(cache_dir),
            ttl,
            clock,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        self.files.dir()
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Returns the payload for `key` if a fresh entry exists in either store
    ///
    /// A fresh file hit is promoted into memory (keeping its original
    /// timestamp) before returning. Stale and absent entries are both `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now_millis();
        let ttl = self.ttl.ttl_for_key(key);

        if let Some(entry) = self.memory.get(key) {
            if entry.is_fresh(now, ttl) {
                if let Some(data) = decode(key, entry.data) {
                    return Some(data);
                }
            }
        }

        let entry = self.read_file(key).await?;
        if !entry.is_fresh(now, ttl) {
            debug!("File cache for {} is stale ({} ms old)", key, entry.age_millis(now));
            return None;
        }

        let data = decode(key, entry.data.clone())?;
        debug!("Promoting {} from file cache into memory", key);
        self.memory.set(key, entry);
        Some(data)
    }

    /// Returns the newest entry for `key` regardless of age
    ///
    /// Used to serve stale data when the upstream is unavailable. Memory is
    /// preferred over disk; nothing is promoted.
    pub async fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let entry = match self.memory.get(key) {
            Some(entry) => entry,
            None => self.read_file(key).await?,
        };

        let now = self.clock.now_millis();
        let is_expired = !entry.is_fresh(now, self.ttl.ttl_for_key(key));
        let cached_at = DateTime::from_timestamp_millis(entry.timestamp).unwrap_or_default();

        Some(CachedData {
            data: decode(key, entry.data)?,
            cached_at,
            is_expired,
        })
    }

    /// Writes `data` to both stores, stamped with the current time
    ///
    /// Failures are logged; the caller's request is never failed by the cache.
    pub async fn set<T: Serialize>(&self, key: &str, data: &T) {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(e) => {
                warn!("Not caching {}: payload is not serializable: {}", key, e);
                return;
            }
        };

        let entry = CacheEntry::new(data, self.clock.now_millis());
        self.memory.set(key, entry.clone());

        if let Err(e) = self.files.write(key, &entry).await {
            warn!("Failed to write file cache for {}: {}", key, e);
        }
    }

    /// Validity and age of every known category, from memory only
    ///
    /// Entries that exist on disk but were never read back are reported as
    /// absent (`age = -1`); this is a diagnostic view of the hot tier.
    pub fn status(&self) -> BTreeMap<String, CacheStatus> {
        let now = self.clock.now_millis();

        CacheCategory::ALL
            .into_iter()
            .map(|category| {
                let status = match self.memory.get(category.as_str()) {
                    Some(entry) => CacheStatus {
                        valid: entry.is_fresh(now, self.ttl.ttl_for_category(category)),
                        age: entry.age_millis(now).div_euclid(1000),
                    },
                    None => CacheStatus::ABSENT,
                };
                (category.as_str().to_string(), status)
            })
            .collect()
    }

    /// Drops one key, or everything, from the memory store
    ///
    /// Files on disk are left alone and expire naturally.
    pub fn invalidate(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                debug!("Invalidating memory cache for {}", key);
                self.memory.delete(key);
            }
            None => {
                debug!("Clearing memory cache ({} entries)", self.memory.len());
                self.memory.clear();
            }
        }
    }

    async fn read_file(&self, key: &str) -> Option<CacheEntry<Value>> {
        match self.files.read(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Treating file cache for {} as a miss: {}", key, e);
                None
            }
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, data: Value) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("Cached payload for {} has an unexpected shape: {}", key, e);
            None
        }
    }
}
