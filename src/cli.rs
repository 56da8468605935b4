//! Command-line interface parsing for marketcache
//!
//! Every subcommand prints one JSON document on stdout; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::cache::CacheCategory;
use crate::refresh::REFRESH_CATEGORIES;
use crate::service::MAX_KLINE_LIMIT;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The category is unknown or cannot be refreshed
    #[error("Invalid category: '{0}'. Valid categories: token_boosts, ave_data, home_data, topics")]
    InvalidCategory(String),
}

/// marketcache - tiered cache and refresher for token market data
#[derive(Parser, Debug)]
#[command(name = "marketcache")]
#[command(about = "Tiered market-data cache with upstream fallback and background refresh")]
#[command(version)]
pub struct Cli {
    /// Cache directory (overrides MARKETCACHE_CACHE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validity and age of every cache category
    Status,

    /// Print the cached payload for a key
    Get {
        key: String,
        /// Also print entries older than their TTL
        #[arg(long)]
        stale: bool,
    },

    /// Re-fetch cache categories from upstream
    ///
    /// Examples:
    ///   marketcache refresh                       # all categories
    ///   marketcache refresh --category home_data  # just one
    Refresh {
        #[arg(long, value_parser = parse_category_arg)]
        category: Option<CacheCategory>,
    },

    /// Refresh all categories on a timer until interrupted
    Watch {
        #[arg(long, default_value_t = 900, value_name = "SECS")]
        interval_secs: u64,
    },

    /// Home page bundle (trending, popular, new)
    Home,

    /// DexScreener top boosted tokens
    Boosts,

    /// Ranking topics
    Topics,

    /// Token ranking for a topic
    Tokens {
        #[arg(long, default_value = "hot")]
        topic: String,
    },

    /// Token detail with its trading pairs
    Details { address: String, chain: String },

    /// Search tokens by keyword
    Search {
        keyword: String,
        #[arg(long)]
        chain: Option<String>,
    },

    /// Candlestick series for a token
    Kline {
        address: String,
        chain: String,
        /// 1m, 5m, 15m, 30m, 1h, 2h, 4h, 1d, 3d, 1w, 1M or 1y
        #[arg(long, default_value = "1d")]
        interval: String,
        #[arg(
            long,
            default_value_t = 100,
            value_parser = clap::value_parser!(u32).range(1..=MAX_KLINE_LIMIT as i64)
        )]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Current prices for one or more `<address>-<chain>` token ids
    Prices {
        #[arg(required = true, value_name = "TOKEN_ID")]
        ids: Vec<String>,
    },
}

/// Parses a refreshable category name.
///
/// # Arguments
/// * `s` - The category name from CLI
///
/// # Returns
/// * `Ok(CacheCategory)` if the name is one of the refreshed categories
/// * `Err(CliError::InvalidCategory)` otherwise
pub fn parse_category_arg(s: &str) -> Result<CacheCategory, CliError> {
    CacheCategory::from_name(s)
        .filter(|c| REFRESH_CATEGORIES.contains(c))
        .ok_or_else(|| CliError::InvalidCategory(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_arg_valid() {
        assert_eq!(parse_category_arg("home_data").unwrap(), CacheCategory::HomeData);
        assert_eq!(parse_category_arg("topics").unwrap(), CacheCategory::Topics);
    }

    #[test]
    fn test_parse_category_arg_not_refreshable() {
        let err = parse_category_arg("token_kline").unwrap_err();
        assert!(err.to_string().contains("Invalid category"));
        assert!(err.to_string().contains("token_kline"));
    }

    #[test]
    fn test_parse_category_arg_unknown() {
        assert!(parse_category_arg("weather").is_err());
    }

    #[test]
    fn test_cli_parse_status_with_global_flags() {
        let cli = Cli::parse_from(["marketcache", "status", "--cache-dir", "/tmp/c", "--debug"]);
        assert_eq!(cli.command, Command::Status);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/c")));
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_parse_refresh_category() {
        let cli = Cli::parse_from(["marketcache", "refresh", "--category", "token_boosts"]);
        assert_eq!(
            cli.command,
            Command::Refresh {
                category: Some(CacheCategory::TokenBoosts)
            }
        );
    }

    #[test]
    fn test_cli_rejects_bad_refresh_category() {
        let result = Cli::try_parse_from(["marketcache", "refresh", "--category", "search_results"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_tokens_defaults_to_hot() {
        let cli = Cli::parse_from(["marketcache", "tokens"]);
        assert_eq!(
            cli.command,
            Command::Tokens {
                topic: "hot".to_string()
            }
        );
    }

    #[test]
    fn test_cli_parse_kline_defaults() {
        let cli = Cli::parse_from(["marketcache", "kline", "0xabc", "bsc"]);
        assert_eq!(
            cli.command,
            Command::Kline {
                address: "0xabc".to_string(),
                chain: "bsc".to_string(),
                interval: "1d".to_string(),
                limit: 100,
                offset: 0,
            }
        );
    }

    #[test]
    fn test_cli_kline_limit_is_bounded() {
        let cli = Cli::parse_from(["marketcache", "kline", "0xabc", "bsc", "--limit", "1000"]);
        assert!(matches!(cli.command, Command::Kline { limit: 1000, .. }));

        for limit in ["0", "1001", "4294967295"] {
            let result =
                Cli::try_parse_from(["marketcache", "kline", "0xabc", "bsc", "--limit", limit]);
            assert!(result.is_err(), "limit {} should be rejected", limit);
        }
    }

    #[test]
    fn test_cli_parse_prices() {
        let cli = Cli::parse_from(["marketcache", "prices", "0xa-bsc", "0xb-eth"]);
        assert_eq!(
            cli.command,
            Command::Prices {
                ids: vec!["0xa-bsc".to_string(), "0xb-eth".to_string()],
            }
        );
        assert!(Cli::try_parse_from(["marketcache", "prices"]).is_err());
    }

    #[test]
    fn test_cli_parse_search_with_chain() {
        let cli = Cli::parse_from(["marketcache", "search", "pepe", "--chain", "eth"]);
        assert_eq!(
            cli.command,
            Command::Search {
                keyword: "pepe".to_string(),
                chain: Some("eth".to_string()),
            }
        );
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["marketcache"]).is_err());
    }
}
