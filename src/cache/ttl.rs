//! Time-to-live table for cache categories
//!
//! Each logical cache partition has its own TTL. Defaults are tuned for how
//! quickly the upstream data moves:
//! - K-line bars: 1 minute (live chart)
//! - Search results: 5 minutes
//! - Token boosts / home page / rank lists: 15-30 minutes
//! - Token details: 1 hour
//! - Rank topics: 24 hours (almost never change)
//!
//! Any default can be overridden at startup with `CACHE_TTL_<CATEGORY>` set to
//! a number of milliseconds.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

/// TTL used for keys that match no category
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// A logical cache partition with its own TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    TokenBoosts,
    HomeData,
    AveData,
    TokenDetails,
    TokenKline,
    SearchResults,
    Topics,
}

impl CacheCategory {
    /// Every category, in status-report order
    pub const ALL: [CacheCategory; 7] = [
        CacheCategory::TokenBoosts,
        CacheCategory::HomeData,
        CacheCategory::AveData,
        CacheCategory::TokenDetails,
        CacheCategory::TokenKline,
        CacheCategory::SearchResults,
        CacheCategory::Topics,
    ];

    /// Category name, which is also the cache key for single-entry categories
    pub fn as_str(self) -> &'static str {
        match self {
            CacheCategory::TokenBoosts => "token_boosts",
            CacheCategory::HomeData => "home_data",
            CacheCategory::AveData => "ave_data",
            CacheCategory::TokenDetails => "token_details",
            CacheCategory::TokenKline => "token_kline",
            CacheCategory::SearchResults => "search_results",
            CacheCategory::Topics => "topics",
        }
    }

    /// Parses a category name (e.g. "home_data")
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Resolves the category a cache key belongs to
    ///
    /// Exact category names match first, then the per-resource key prefixes
    /// (`token_details_<addr>_<chain>`, `search_<keyword>`, `kline_...`,
    /// `tokens_<topic>`).
    pub fn for_key(key: &str) -> Option<Self> {
        if let Some(category) = Self::from_name(key) {
            return Some(category);
        }

        const PREFIXES: [(&str, CacheCategory); 4] = [
            ("token_details_", CacheCategory::TokenDetails),
            ("search_", CacheCategory::SearchResults),
            ("kline_", CacheCategory::TokenKline),
            ("tokens_", CacheCategory::AveData),
        ];

        PREFIXES
            .into_iter()
            .find(|(prefix, _)| key.starts_with(prefix))
            .map(|(_, category)| category)
    }

    /// Environment variable that overrides this category's TTL
    pub fn env_var(self) -> String {
        format!("CACHE_TTL_{}", self.as_str().to_uppercase())
    }

    /// Built-in TTL for this category
    pub fn default_ttl(self) -> Duration {
        match self {
            CacheCategory::TokenBoosts => Duration::from_secs(15 * 60),
            CacheCategory::HomeData => Duration::from_secs(20 * 60),
            CacheCategory::AveData => Duration::from_secs(30 * 60),
            CacheCategory::TokenDetails => Duration::from_secs(60 * 60),
            CacheCategory::TokenKline => Duration::from_secs(60),
            CacheCategory::SearchResults => Duration::from_secs(5 * 60),
            CacheCategory::Topics => Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable category → TTL table, built once at startup
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    ttls: HashMap<CacheCategory, Duration>,
    default_ttl: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            ttls: CacheCategory::ALL
                .into_iter()
                .map(|c| (c, c.default_ttl()))
                .collect(),
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl TtlPolicy {
    /// Builds the table from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the table from an arbitrary variable lookup
    ///
    /// Overrides are milliseconds. Zero or unparsable values are ignored and
    /// the category default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = Self::default();

        for category in CacheCategory::ALL {
            let var = category.env_var();
            let Some(raw) = lookup(&var) else {
                continue;
            };

            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => {
                    policy.ttls.insert(category, Duration::from_millis(ms));
                }
                _ => warn!(
                    "Ignoring {}={:?}: expected a positive number of milliseconds",
                    var, raw
                ),
            }
        }

        policy
    }

    /// Overrides one category's TTL
    pub fn with_ttl(mut self, category: CacheCategory, ttl: Duration) -> Self {
        self.ttls.insert(category, ttl);
        self
    }

    pub fn ttl_for_category(&self, category: CacheCategory) -> Duration {
        self.ttls
            .get(&category)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// TTL for an arbitrary cache key, falling back to the default TTL
    pub fn ttl_for_key(&self, key: &str) -> Duration {
        CacheCategory::for_key(key)
            .map(|c| self.ttl_for_category(c))
            .unwrap_or(self.default_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let policy = TtlPolicy::default();
        assert_eq!(
            policy.ttl_for_category(CacheCategory::TokenBoosts),
            Duration::from_millis(900_000)
        );
        assert_eq!(
            policy.ttl_for_category(CacheCategory::HomeData),
            Duration::from_millis(1_200_000)
        );
        assert_eq!(
            policy.ttl_for_category(CacheCategory::AveData),
            Duration::from_millis(1_800_000)
        );
        assert_eq!(
            policy.ttl_for_category(CacheCategory::TokenDetails),
            Duration::from_millis(3_600_000)
        );
        assert_eq!(
            policy.ttl_for_category(CacheCategory::TokenKline),
            Duration::from_millis(60_000)
        );
        assert_eq!(
            policy.ttl_for_category(CacheCategory::SearchResults),
            Duration::from_millis(300_000)
        );
        assert_eq!(
            policy.ttl_for_category(CacheCategory::Topics),
            Duration::from_millis(86_400_000)
        );
    }

    #[test]
    fn test_env_var_names() {
        assert_eq!(CacheCategory::TokenBoosts.env_var(), "CACHE_TTL_TOKEN_BOOSTS");
        assert_eq!(CacheCategory::SearchResults.env_var(), "CACHE_TTL_SEARCH_RESULTS");
    }

    #[test]
    fn test_lookup_overrides_single_category() {
        let policy = TtlPolicy::from_lookup(|name| match name {
            "CACHE_TTL_TOPICS" => Some("5000".to_string()),
            _ => None,
        });

        assert_eq!(
            policy.ttl_for_category(CacheCategory::Topics),
            Duration::from_millis(5000)
        );
        assert_eq!(
            policy.ttl_for_category(CacheCategory::HomeData),
            CacheCategory::HomeData.default_ttl()
        );
    }

    #[test]
    fn test_invalid_overrides_keep_default() {
        let policy = TtlPolicy::from_lookup(|name| match name {
            "CACHE_TTL_TOPICS" => Some("soon".to_string()),
            "CACHE_TTL_HOME_DATA" => Some("0".to_string()),
            _ => None,
        });

        assert_eq!(
            policy.ttl_for_category(CacheCategory::Topics),
            CacheCategory::Topics.default_ttl()
        );
        assert_eq!(
            policy.ttl_for_category(CacheCategory::HomeData),
            CacheCategory::HomeData.default_ttl()
        );
    }

    #[test]
    fn test_key_resolution() {
        assert_eq!(CacheCategory::for_key("home_data"), Some(CacheCategory::HomeData));
        assert_eq!(
            CacheCategory::for_key("token_details_0xabc_bsc"),
            Some(CacheCategory::TokenDetails)
        );
        assert_eq!(
            CacheCategory::for_key("search_pepe_eth"),
            Some(CacheCategory::SearchResults)
        );
        assert_eq!(
            CacheCategory::for_key("kline_0xabc_bsc_1h_100_0"),
            Some(CacheCategory::TokenKline)
        );
        assert_eq!(CacheCategory::for_key("tokens_meme"), Some(CacheCategory::AveData));
        assert_eq!(CacheCategory::for_key("something_else"), None);
    }

    #[test]
    fn test_unknown_key_uses_default_ttl() {
        let policy = TtlPolicy::default().with_ttl(CacheCategory::Topics, Duration::from_secs(1));
        assert_eq!(policy.ttl_for_key("mystery"), DEFAULT_TTL);
        assert_eq!(policy.ttl_for_key("topics"), Duration::from_secs(1));
    }

    #[test]
    fn test_from_name_roundtrips_every_category() {
        for category in CacheCategory::ALL {
            assert_eq!(CacheCategory::from_name(category.as_str()), Some(category));
        }
        assert_eq!(CacheCategory::from_name("nope"), None);
    }
}
