//! Ave.ai market-data API client
//!
//! Ave.ai serves rank topics, per-topic token rankings, token search, token
//! details, batch prices and K-line bars. Every endpoint needs the
//! `X-API-KEY` header. Responses are returned as raw JSON; shaping them is
//! the job of [`super::transforms`].

use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::fetcher::HttpFetcher;
use crate::error::ApiError;

/// Base URL for the Ave.ai API
pub const AVE_BASE_URL: &str = "https://prod.ave-api.com/v2";

/// Header carrying the Ave.ai API key
const API_KEY_HEADER: &str = "x-api-key";

/// Client for the Ave.ai REST API
#[derive(Debug, Clone)]
pub struct AveClient {
    fetcher: HttpFetcher,
    base_url: String,
    headers: HeaderMap,
}

impl AveClient {
    /// Creates a client against the production API
    pub fn new(fetcher: HttpFetcher, api_key: Option<&str>) -> Self {
        Self::with_base_url(fetcher, api_key, AVE_BASE_URL)
    }

    /// Creates a client against a custom base URL (mirrors, tests)
    pub fn with_base_url(
        fetcher: HttpFetcher,
        api_key: Option<&str>,
        base_url: impl Into<String>,
    ) -> Self {
        let mut headers = HeaderMap::new();
        match api_key.map(HeaderValue::from_str) {
            Some(Ok(value)) => {
                headers.insert(API_KEY_HEADER, value);
            }
            Some(Err(_)) => warn!("AVE_API_KEY contains invalid header characters; sending no key"),
            None => warn!("No Ave.ai API key configured; requests will likely be rejected"),
        }

        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /ranks/topics`
    pub async fn rank_topics(&self) -> Result<Value, ApiError> {
        debug!("Fetching rank topics from Ave.ai");
        self.fetcher
            .get_json(&self.url("/ranks/topics"), &[], &self.headers)
            .await
    }

    /// `GET /ranks?topic=<topic>`
    pub async fn tokens_by_topic(&self, topic: &str) -> Result<Value, ApiError> {
        debug!("Fetching {} token ranking from Ave.ai", topic);
        self.fetcher
            .get_json(
                &self.url("/ranks"),
                &[("topic", topic.to_string())],
                &self.headers,
            )
            .await
    }

    /// `GET /tokens?keyword=<keyword>[&chain=<chain>]`
    pub async fn search_tokens(&self, keyword: &str, chain: Option<&str>) -> Result<Value, ApiError> {
        debug!("Searching Ave.ai tokens for {:?}", keyword);
        let mut query = vec![("keyword", keyword.to_string())];
        if let Some(chain) = chain {
            query.push(("chain", chain.to_string()));
        }
        self.fetcher
            .get_json(&self.url("/tokens"), &query, &self.headers)
            .await
    }

    /// `GET /tokens/<token_id>`, where the id is `<address>-<chain>`
    pub async fn token_details(&self, token_id: &str) -> Result<Value, ApiError> {
        debug!("Fetching token details for {}", token_id);
        let path = format!("/tokens/{}", urlencoding::encode(token_id));
        self.fetcher
            .get_json(&self.url(&path), &[], &self.headers)
            .await
    }

    /// `POST /tokens/price` with `{ "token_ids": [...] }`
    pub async fn token_prices(&self, token_ids: &[String]) -> Result<Value, ApiError> {
        debug!("Fetching prices for {} tokens", token_ids.len());
        self.fetcher
            .post_json(
                &self.url("/tokens/price"),
                &json!({ "token_ids": token_ids }),
                &self.headers,
            )
            .await
    }

    /// `GET /klines/token/<token_id>?interval=<minutes>&size=<n>&offset=<n>`
    pub async fn token_kline(
        &self,
        token_id: &str,
        interval_minutes: u32,
        size: u32,
        offset: u32,
    ) -> Result<Value, ApiError> {
        debug!(
            "Fetching K-line for {} (interval={}m, size={}, offset={})",
            token_id, interval_minutes, size, offset
        );
        let path = format!("/klines/token/{}", urlencoding::encode(token_id));
        self.fetcher
            .get_json(
                &self.url(&path),
                &[
                    ("interval", interval_minutes.to_string()),
                    ("size", size.to_string()),
                    ("offset", offset.to_string()),
                ],
                &self.headers,
            )
            .await
    }
}

/// Builds the Ave.ai token id for an address on a chain
pub fn token_id(address: &str, chain: &str) -> String {
    format!("{}-{}", address, chain)
}
