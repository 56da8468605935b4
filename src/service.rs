//! Request-path operations
//!
//! Each operation serves from the cache when it can, fetches and caches on a
//! miss, and on upstream failure degrades to stale cached data, then to
//! placeholder data or an empty payload. Results are always wrapped in an
//! [`ApiResponse`], never an error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheCategory, CacheManager, ExpiringStore};
use crate::data::ave::token_id;
use crate::data::transforms::{
    dummy_tokens, dummy_topics, interval_minutes, is_valid_ave_list, mock_kline,
    prepare_home_data, transform_ave_token_detail, transform_ave_tokens,
    transform_kline_points, transform_rank_topics, transform_token_prices,
};
use crate::data::{
    AveClient, DexScreenerClient, HomeData, KLineSeries, SearchResults, TokenDetailPayload,
    TokenList, TokenPrices, TopicList,
};
use crate::error::ApiError;
use crate::refresh::Refresher;
use crate::response::ApiResponse;

/// How long real K-line data is kept
const KLINE_TTL: Duration = Duration::from_secs(5 * 60);
/// How long synthesized K-line data is kept
const MOCK_KLINE_TTL: Duration = Duration::from_secs(60);
/// Largest K-line page, in bars
pub const MAX_KLINE_LIMIT: u32 = 1000;

/// What to serve when the upstream fails and nothing is cached
enum Fallback<T> {
    /// Generated stand-in data, marked stale
    Placeholder(T),
    /// A failure envelope carrying this empty payload
    Empty(T),
}

/// Cache-or-fetch front end over the upstream clients
#[derive(Debug, Clone)]
pub struct MarketService {
    cache: Arc<CacheManager>,
    ave: AveClient,
    refresher: Refresher,
    klines: ExpiringStore<KLineSeries>,
}

impl MarketService {
    pub fn new(cache: Arc<CacheManager>, ave: AveClient, dex: DexScreenerClient) -> Self {
        let refresher = Refresher::new(Arc::clone(&cache), ave.clone(), dex);
        Self {
            cache,
            ave,
            refresher,
            klines: ExpiringStore::new(),
        }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// The refresher sharing this service's cache and clients
    pub fn refresher(&self) -> &Refresher {
        &self.refresher
    }

    /// Home page bundle (`home_data`)
    pub async fn home(&self) -> ApiResponse<HomeData> {
        self.serve(
            CacheCategory::HomeData.as_str(),
            self.refresher.load_home_data(),
            || {
                let now = self.cache.now_millis();
                Fallback::Placeholder(prepare_home_data(dummy_tokens(50), "fallback", now))
            },
        )
        .await
    }

    /// DexScreener top boosts (`token_boosts`)
    pub async fn token_boosts(&self) -> ApiResponse<TokenList> {
        self.serve(
            CacheCategory::TokenBoosts.as_str(),
            self.refresher.fetch_token_boosts(),
            || Fallback::Empty(TokenList::default()),
        )
        .await
    }

    /// Ranking topics (`topics`)
    pub async fn topics(&self) -> ApiResponse<TopicList> {
        let fetch = async {
            let raw = self.ave.rank_topics().await?;
            if !is_valid_ave_list(&raw) {
                return Err(ApiError::InvalidResponse(
                    "Ave.ai rank topics response has no data list".to_string(),
                ));
            }
            Ok(TopicList {
                topics: transform_rank_topics(&raw),
            })
        };

        self.serve(CacheCategory::Topics.as_str(), fetch, || {
            Fallback::Placeholder(TopicList {
                topics: dummy_topics(),
            })
        })
        .await
    }

    /// Token ranking for one topic (`tokens_<topic>`)
    pub async fn tokens(&self, topic: &str) -> ApiResponse<TokenList> {
        let topic = topic.trim();
        if topic.is_empty() {
            return self.invalid("topic is required", TokenList::default());
        }

        let fetch = async {
            let tokens = self.refresher.fetch_topic_tokens(topic).await?;
            Ok::<_, ApiError>(TokenList::new(tokens))
        };

        self.serve(&format!("tokens_{}", topic), fetch, || {
            Fallback::Placeholder(TokenList::new(dummy_tokens(20)))
        })
        .await
    }

    /// One token with its pairs (`token_details_<address>_<chain>`)
    pub async fn token_details(&self, address: &str, chain: &str) -> ApiResponse<TokenDetailPayload> {
        let (address, chain) = (address.trim(), chain.trim());
        if address.is_empty() || chain.is_empty() {
            return self.invalid("address and chain are required", TokenDetailPayload::default());
        }

        let id = token_id(address, chain);
        let fetch = async {
            let raw = self.ave.token_details(&id).await?;
            let token = transform_ave_token_detail(&raw)
                .ok_or_else(|| ApiError::NotFound(format!("token {}", id)))?;
            Ok::<_, ApiError>(TokenDetailPayload { token })
        };

        self.serve(
            &format!("token_details_{}_{}", address, chain),
            fetch,
            || Fallback::Empty(TokenDetailPayload::default()),
        )
        .await
    }

    /// Keyword search (`search_<keyword>[_<chain>]`)
    pub async fn search(&self, keyword: &str, chain: Option<&str>) -> ApiResponse<SearchResults> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return self.invalid("keyword is required", SearchResults::default());
        }
        let chain = chain.map(str::trim).filter(|c| !c.is_empty());

        let key = match chain {
            Some(chain) => format!("search_{}_{}", keyword, chain),
            None => format!("search_{}", keyword),
        };

        let fetch = async {
            let raw = self.ave.search_tokens(keyword, chain).await?;
            if !is_valid_ave_list(&raw) {
                return Err(ApiError::InvalidResponse(
                    "Ave.ai search response has no data list".to_string(),
                ));
            }
            let tokens = transform_ave_tokens(&raw);
            Ok(SearchResults {
                count: tokens.len(),
                tokens,
                keyword: keyword.to_string(),
            })
        };

        self.serve(&key, fetch, || Fallback::Placeholder(placeholder_search(keyword)))
            .await
    }

    /// Candlestick series for a token
    ///
    /// Real data is kept for five minutes. When the upstream fails or has no
    /// points, a synthesized series is served and kept for one minute.
    pub async fn kline(
        &self,
        address: &str,
        chain: &str,
        interval: &str,
        limit: u32,
        offset: u32,
    ) -> ApiResponse<KLineSeries> {
        let (address, chain) = (address.trim(), chain.trim());
        if address.is_empty() || chain.is_empty() {
            return self.invalid("address and chain are required", KLineSeries::default());
        }
        if limit == 0 || limit > MAX_KLINE_LIMIT {
            return self.invalid(
                &format!("limit must be between 1 and {}", MAX_KLINE_LIMIT),
                KLineSeries::default(),
            );
        }

        let key = format!("kline_{}_{}_{}_{}_{}", address, chain, interval, limit, offset);
        let now = self.cache.now_millis();

        if let Some(series) = self.klines.get(&key) {
            debug!("K-line cache hit for {}", key);
            return ApiResponse::ok(series, now);
        }

        let now_secs = now.div_euclid(1000);
        let fetched = self
            .ave
            .token_kline(
                &token_id(address, chain),
                interval_minutes(interval),
                limit,
                offset,
            )
            .await
            .map(|raw| transform_kline_points(&raw, now_secs));

        let (series, ttl) = match fetched {
            Ok(bars) if !bars.is_empty() => (
                KLineSeries {
                    bars,
                    interval: interval.to_string(),
                    synthetic: false,
                },
                KLINE_TTL,
            ),
            outcome => {
                match outcome {
                    Err(e) => warn!("K-line fetch for {} failed, synthesizing: {}", key, e),
                    Ok(_) => info!("No K-line points for {}, synthesizing", key),
                }
                let bars = mock_kline(limit as usize, interval, offset as usize, now_secs);
                (
                    KLineSeries {
                        bars,
                        interval: interval.to_string(),
                        synthetic: true,
                    },
                    MOCK_KLINE_TTL,
                )
            }
        };

        self.klines.set(key, series.clone(), ttl);
        ApiResponse::ok(series, now)
    }

    /// Current prices for a batch of `<address>-<chain>` token ids
    ///
    /// Prices go straight to Ave.ai and are never cached. On failure the
    /// envelope carries an empty price map.
    pub async fn prices(&self, token_ids: &[String]) -> ApiResponse<TokenPrices> {
        let ids: Vec<String> = token_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return self.invalid("at least one token id is required", TokenPrices::default());
        }

        let fetched = self.ave.token_prices(&ids).await.and_then(|raw| {
            transform_token_prices(&raw).ok_or_else(|| {
                ApiError::InvalidResponse("Ave.ai price response has no data map".to_string())
            })
        });

        let now = self.cache.now_millis();
        match fetched {
            Ok(prices) => ApiResponse::ok(prices, now),
            Err(e) => {
                warn!("Price lookup for {} tokens failed: {}", ids.len(), e);
                ApiResponse::failure(&e, TokenPrices::default(), now)
            }
        }
    }

    /// Fresh cache → upstream → stale cache → fallback
    async fn serve<T, Fut>(
        &self,
        key: &str,
        fetch: Fut,
        fallback: impl FnOnce() -> Fallback<T>,
    ) -> ApiResponse<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(data) = self.cache.get::<T>(key).await {
            debug!("Cache hit for {}", key);
            return ApiResponse::ok(data, self.cache.now_millis());
        }

        let error = match fetch.await {
            Ok(data) => {
                self.cache.set(key, &data).await;
                return ApiResponse::ok(data, self.cache.now_millis());
            }
            Err(e) => e,
        };

        let now = self.cache.now_millis();
        if let Some(cached) = self.cache.get_entry::<T>(key).await {
            warn!("Serving stale {} after upstream failure: {}", key, error);
            return ApiResponse::stale(cached.data, error.to_string(), cached.cached_at, now);
        }

        match fallback() {
            Fallback::Placeholder(data) => {
                warn!("Serving placeholder {} after upstream failure: {}", key, error);
                ApiResponse::placeholder(data, error.to_string(), now)
            }
            Fallback::Empty(data) => {
                warn!("No data for {}: {}", key, error);
                ApiResponse::failure(&error, data, now)
            }
        }
    }

    fn invalid<T>(&self, message: &str, empty: T) -> ApiResponse<T> {
        ApiResponse::failure(
            &ApiError::InvalidParameter(message.to_string()),
            empty,
            self.cache.now_millis(),
        )
    }
}

/// Ten generated tokens themed after the search keyword
fn placeholder_search(keyword: &str) -> SearchResults {
    let suffix: String = keyword.chars().take(2).collect::<String>().to_uppercase();
    let tokens: Vec<_> = dummy_tokens(10)
        .into_iter()
        .map(|mut token| {
            token.name = format!("{} {}", keyword, token.name);
            token.symbol = format!("{}{}", token.symbol, suffix);
            token
        })
        .collect();

    SearchResults {
        count: tokens.len(),
        tokens,
        keyword: keyword.to_string(),
    }
}
