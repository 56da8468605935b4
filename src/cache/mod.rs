//! Tiered response cache
//!
//! Responses from upstream market-data APIs are kept in two stores: a
//! process-lifetime in-memory map (fast path) and one JSON file per key on
//! disk (survives restarts). The [`CacheManager`] façade reads through both and
//! writes to both, judging freshness against a per-category TTL table.
//!
//! Storage failures never reach callers; a broken cache is just a miss.

pub mod clock;
pub mod file;
pub mod manager;
pub mod memory;
pub mod ttl;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::FileStore;
pub use manager::{CacheManager, CacheStatus, CachedData};
pub use memory::{ExpiringStore, MemoryStore};
pub use ttl::{CacheCategory, TtlPolicy, DEFAULT_TTL};

/// A timestamped payload, as stored in memory and on disk
///
/// On disk this is `{ "data": <payload>, "timestamp": <ms since epoch> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T = Value> {
    /// The cached payload
    pub data: T,
    /// When the payload was written, in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, timestamp: i64) -> Self {
        Self { data, timestamp }
    }

    /// Milliseconds elapsed since the entry was written
    pub fn age_millis(&self, now: i64) -> i64 {
        now - self.timestamp
    }

    /// Whether the entry is still fresh: `now - timestamp < ttl`
    pub fn is_fresh(&self, now: i64, ttl: std::time::Duration) -> bool {
        i128::from(self.age_millis(now)) < ttl.as_millis() as i128
    }
}
