//! DexScreener API client
//!
//! Only the top token boosts list is used; it needs no authentication and is
//! the secondary source for the home page when Ave.ai is down.

use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::debug;

use super::fetcher::HttpFetcher;
use crate::error::ApiError;

/// Base URL for the DexScreener API
pub const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com";

/// Client for the DexScreener REST API
#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    fetcher: HttpFetcher,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_base_url(fetcher, DEXSCREENER_BASE_URL)
    }

    /// Creates a client against a custom base URL (mirrors, tests)
    pub fn with_base_url(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `GET /token-boosts/top/v1`
    pub async fn token_boosts(&self) -> Result<Value, ApiError> {
        debug!("Fetching top token boosts from DexScreener");
        let url = format!("{}/token-boosts/top/v1", self.base_url);
        self.fetcher.get_json(&url, &[], &HeaderMap::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fetcher::{RetryConfig, DEFAULT_TIMEOUT};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_token_boosts_hits_top_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/token-boosts/top/v1");
                then.status(200)
                    .json_body(json!([{"chainId": "solana", "tokenAddress": "So1"}]));
            })
            .await;

        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT, RetryConfig::default()).unwrap();
        let client = DexScreenerClient::with_base_url(fetcher, server.base_url());
        let body = client.token_boosts().await.unwrap();

        assert_eq!(body[0]["tokenAddress"], "So1");
        mock.assert_calls_async(1).await;
    }
}
