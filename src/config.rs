//! Runtime settings read once from the environment at startup

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use tracing::warn;

use crate::cache::{CacheManager, TtlPolicy};
use crate::data::ave::AVE_BASE_URL;
use crate::data::dexscreener::DEXSCREENER_BASE_URL;
use crate::data::fetcher::DEFAULT_TIMEOUT;
use crate::data::{AveClient, DexScreenerClient, HttpFetcher, RetryConfig};
use crate::error::ApiError;
use crate::service::MarketService;

pub const CACHE_DIR_VAR: &str = "MARKETCACHE_CACHE_DIR";

/// Everything the binary needs to wire up the cache and the upstream clients
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub ave_api_key: Option<String>,
    pub ave_base_url: String,
    pub dexscreener_base_url: String,
    pub retry: RetryConfig,
    /// Per-request timeout for upstream calls
    pub timeout: Duration,
    pub ttl: TtlPolicy,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup
    ///
    /// Empty values count as unset. Malformed numbers are logged and the
    /// default is used.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let defaults = RetryConfig::default();
        let retry = RetryConfig {
            retries: parse_var(&get, "FETCH_RETRIES").unwrap_or(defaults.retries),
            initial_backoff: parse_var(&get, "FETCH_INITIAL_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_backoff: parse_var(&get, "FETCH_MAX_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_backoff),
        };

        Self {
            cache_dir: get(CACHE_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(default_cache_dir),
            ave_api_key: get("AVE_API_KEY"),
            ave_base_url: get("AVE_API_BASE_URL").unwrap_or_else(|| AVE_BASE_URL.to_string()),
            dexscreener_base_url: get("DEXSCREENER_API_BASE_URL")
                .unwrap_or_else(|| DEXSCREENER_BASE_URL.to_string()),
            retry,
            timeout: parse_var::<u64, _>(&get, "FETCH_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            ttl: TtlPolicy::from_lookup(&lookup),
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Opens the cache without touching the network
    pub fn cache(&self) -> CacheManager {
        CacheManager::new(self.cache_dir.clone(), self.ttl.clone())
    }

    /// Wires the cache and both upstream clients into a service
    pub fn service(&self) -> Result<MarketService, ApiError> {
        let fetcher = HttpFetcher::new(self.timeout, self.retry)?;
        let ave = AveClient::with_base_url(
            fetcher.clone(),
            self.ave_api_key.as_deref(),
            self.ave_base_url.clone(),
        );
        let dex = DexScreenerClient::with_base_url(fetcher, self.dexscreener_base_url.clone());

        Ok(MarketService::new(Arc::new(self.cache()), ave, dex))
    }
}

/// Platform cache directory, or `./cache` when none can be determined
pub fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "marketcache")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("cache"))
}

fn parse_var<T, G>(get: &G, name: &str) -> Option<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid number", name, raw);
            None
        }
    }
}
