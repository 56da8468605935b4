//! Market data models and upstream API clients
//!
//! This module contains the canonical shapes the cache stores and the
//! dashboard consumes, plus the clients that fetch raw data from Ave.ai and
//! DexScreener and the transforms that turn raw JSON into those shapes.

pub mod ave;
pub mod dexscreener;
pub mod fetcher;
pub mod transforms;

pub use ave::AveClient;
pub use dexscreener::DexScreenerClient;
pub use fetcher::{retry_with_backoff, HttpFetcher, RetryConfig};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A token row as shown in rankings, search results and the home page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenData {
    /// Contract address
    pub token: String,
    /// Chain identifier (e.g. "bsc", "eth", "solana")
    pub chain: String,
    pub symbol: String,
    pub name: String,
    pub logo_url: String,
    pub current_price_usd: f64,
    /// 24h price change in percent
    pub price_change_24h: f64,
    /// 24h traded volume in USD
    pub tx_volume_u_24h: f64,
    pub holders: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fdv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burn_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_percent: Option<String>,
    /// Raw JSON string of extra metadata, as sent by Ave.ai
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appendix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_count_24h: Option<i64>,
}

/// A liquidity pair a token trades in
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenPair {
    pub exchange: String,
    pub pair_address: String,
    pub reserve0: String,
    pub reserve1: String,
    pub token0_price_eth: String,
    pub token0_price_usd: String,
    pub token1_price_eth: String,
    pub token1_price_usd: String,
    pub price_change: String,
    pub price_change_24h: String,
    pub volume_u: String,
    pub low_u: String,
    pub high_u: String,
}

/// Full token detail: the token row plus its pairs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenDetail {
    #[serde(flatten)]
    pub token: TokenData,
    #[serde(default)]
    pub pairs: Vec<TokenPair>,
}

/// A ranking topic (e.g. "hot", "meme")
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RankTopic {
    pub id: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub name_zh: String,
}

/// One candlestick bar; `time` is Unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KLineBar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Cached payload for token lists (token_boosts, ave_data, tokens_<topic>)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenList {
    pub tokens: Vec<TokenData>,
    pub count: usize,
}

impl TokenList {
    pub fn new(tokens: Vec<TokenData>) -> Self {
        Self {
            count: tokens.len(),
            tokens,
        }
    }
}

/// Cached payload for the topics category
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopicList {
    pub topics: Vec<RankTopic>,
}

/// Cached payload for a keyword search
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub tokens: Vec<TokenData>,
    pub count: usize,
    pub keyword: String,
}

/// Cached payload for one token's detail page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenDetailPayload {
    pub token: TokenDetail,
}

/// Batch price lookup, keyed by `<address>-<chain>` token id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenPrices {
    pub prices: BTreeMap<String, TokenData>,
    pub count: usize,
}

/// Candlestick series for one token and interval
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KLineSeries {
    pub bars: Vec<KLineBar>,
    pub interval: String,
    /// True when the bars were synthesized because no real data was available
    #[serde(default)]
    pub synthetic: bool,
}

/// Home page bundle: the full list plus curated slices of it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HomeData {
    pub tokens: Vec<TokenData>,
    pub count: usize,
    /// First 10 tokens in upstream order
    pub trending: Vec<TokenData>,
    /// Top 15 by price
    pub popular: Vec<TokenData>,
    /// Last 20 tokens in upstream order
    #[serde(rename = "new")]
    pub new_tokens: Vec<TokenData>,
    pub success: bool,
    pub timestamp: i64,
    /// Which upstream the tokens came from
    pub source: String,
}
