//! Background cache refresh
//!
//! Re-populates the shared cache categories (token_boosts, ave_data,
//! home_data, topics) from upstream. The tasks run concurrently and are
//! settled rather than short-circuited, so one failing upstream never cancels
//! its siblings. [`RefreshHandle`] runs the same refresh on a timer.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::{CacheCategory, CacheManager};
use crate::data::transforms::{
    is_valid_ave_list, prepare_home_data, transform_ave_tokens, transform_dexscreener_tokens,
    transform_rank_topics,
};
use crate::data::{AveClient, DexScreenerClient, HomeData, TokenData, TokenList, TopicList};
use crate::error::ApiError;

/// Categories refreshed by [`Refresher::refresh_all`], in task order
pub const REFRESH_CATEGORIES: [CacheCategory; 4] = [
    CacheCategory::TokenBoosts,
    CacheCategory::AveData,
    CacheCategory::HomeData,
    CacheCategory::Topics,
];

/// Outcome tally of one refresh run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

/// A named unit of refresh work
pub type RefreshTask<'a> = (&'static str, BoxFuture<'a, Result<(), ApiError>>);

/// Awaits every task to completion and tallies the outcomes
///
/// Failures are logged and counted; they never cancel the remaining tasks.
pub async fn settle_all(tasks: Vec<RefreshTask<'_>>) -> RefreshSummary {
    let (names, futures): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
    let results = join_all(futures).await;

    let mut summary = RefreshSummary {
        total: results.len(),
        ..Default::default()
    };

    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(()) => {
                debug!("Refreshed {}", name);
                summary.succeeded += 1;
            }
            Err(e) => {
                warn!("Failed to refresh {}: {}", name, e);
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Fetches upstream data and writes it into the shared cache
#[derive(Debug, Clone)]
pub struct Refresher {
    cache: Arc<CacheManager>,
    ave: AveClient,
    dex: DexScreenerClient,
}

impl Refresher {
    pub fn new(cache: Arc<CacheManager>, ave: AveClient, dex: DexScreenerClient) -> Self {
        Self { cache, ave, dex }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Refreshes every category concurrently
    pub async fn refresh_all(&self) -> RefreshSummary {
        info!("Refreshing {} cache categories", REFRESH_CATEGORIES.len());

        let tasks = REFRESH_CATEGORIES
            .into_iter()
            .map(|category| (category.as_str(), self.refresh_task(category)))
            .collect();

        let summary = settle_all(tasks).await;
        info!(
            "Cache refresh finished: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );
        summary
    }

    /// Refreshes a single category by name
    ///
    /// The in-memory entry is dropped first so readers cannot be served the
    /// old value once this returns. Only the categories in
    /// [`REFRESH_CATEGORIES`] are accepted.
    pub async fn refresh_category(&self, name: &str) -> Result<(), ApiError> {
        let category = CacheCategory::from_name(name)
            .filter(|c| REFRESH_CATEGORIES.contains(c))
            .ok_or_else(|| {
                ApiError::InvalidParameter(format!(
                    "unknown refresh category {:?} (expected one of: {})",
                    name,
                    REFRESH_CATEGORIES.map(CacheCategory::as_str).join(", ")
                ))
            })?;

        self.cache.invalidate(Some(category.as_str()));
        self.refresh_task(category).await
    }

    fn refresh_task(&self, category: CacheCategory) -> BoxFuture<'_, Result<(), ApiError>> {
        match category {
            CacheCategory::TokenBoosts => self.refresh_token_boosts().boxed(),
            CacheCategory::AveData => self.refresh_ave_data().boxed(),
            CacheCategory::HomeData => self.refresh_home_data().boxed(),
            CacheCategory::Topics => self.refresh_topics().boxed(),
            other => async move {
                Err(ApiError::InvalidParameter(format!(
                    "{} is filled on demand and cannot be refreshed",
                    other
                )))
            }
            .boxed(),
        }
    }

    pub async fn refresh_token_boosts(&self) -> Result<(), ApiError> {
        let list = self.fetch_token_boosts().await?;
        self.cache
            .set(CacheCategory::TokenBoosts.as_str(), &list)
            .await;
        Ok(())
    }

    pub async fn refresh_ave_data(&self) -> Result<(), ApiError> {
        let tokens = self.fetch_topic_tokens("hot").await?;
        self.cache
            .set(CacheCategory::AveData.as_str(), &TokenList::new(tokens))
            .await;
        Ok(())
    }

    pub async fn refresh_home_data(&self) -> Result<(), ApiError> {
        let home = self.load_home_data().await?;
        self.cache.set(CacheCategory::HomeData.as_str(), &home).await;
        Ok(())
    }

    pub async fn refresh_topics(&self) -> Result<(), ApiError> {
        let raw = self.ave.rank_topics().await?;
        if !is_valid_ave_list(&raw) {
            return Err(ApiError::InvalidResponse(
                "Ave.ai rank topics response has no data list".to_string(),
            ));
        }

        let topics = TopicList {
            topics: transform_rank_topics(&raw),
        };
        self.cache.set(CacheCategory::Topics.as_str(), &topics).await;
        Ok(())
    }

    /// Builds the home page bundle from the first source that has tokens
    ///
    /// Sources in order: the Ave.ai `hot` ranking, a fresh cached
    /// token_boosts list, a live DexScreener fetch. Fails only when all of
    /// them come up empty.
    pub async fn load_home_data(&self) -> Result<HomeData, ApiError> {
        let now = self.cache.now_millis();

        match self.fetch_topic_tokens("hot").await {
            Ok(tokens) if !tokens.is_empty() => return Ok(prepare_home_data(tokens, "ave", now)),
            Ok(_) => warn!("Ave.ai returned no hot tokens, falling back to DexScreener"),
            Err(e) => warn!("Ave.ai hot tokens unavailable, falling back to DexScreener: {}", e),
        }

        if let Some(list) = self
            .cache
            .get::<TokenList>(CacheCategory::TokenBoosts.as_str())
            .await
            .filter(|list| !list.tokens.is_empty())
        {
            debug!("Building home data from cached token boosts");
            return Ok(prepare_home_data(list.tokens, "dexscreener_cache", now));
        }

        let list = self.fetch_token_boosts().await?;
        Ok(prepare_home_data(list.tokens, "dexscreener", now))
    }

    /// Live DexScreener top boosts; an empty list is an error
    pub async fn fetch_token_boosts(&self) -> Result<TokenList, ApiError> {
        let raw = self.dex.token_boosts().await?;
        let tokens = transform_dexscreener_tokens(&raw);
        if tokens.is_empty() {
            return Err(ApiError::InvalidResponse(
                "DexScreener returned no token boosts".to_string(),
            ));
        }
        Ok(TokenList::new(tokens))
    }

    /// Live Ave.ai ranking for one topic
    pub async fn fetch_topic_tokens(&self, topic: &str) -> Result<Vec<TokenData>, ApiError> {
        let raw = self.ave.tokens_by_topic(topic).await?;
        if !is_valid_ave_list(&raw) {
            return Err(ApiError::InvalidResponse(format!(
                "Ave.ai {} ranking has no data list",
                topic
            )));
        }
        Ok(transform_ave_tokens(&raw))
    }
}

/// Messages sent from the background refresh loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshMessage {
    /// A refresh run is starting
    RefreshStarted,
    /// A refresh run finished
    RefreshCompleted(RefreshSummary),
}

/// Configuration for the periodic refresh loop
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between refresh runs; the first run starts immediately
    pub interval: Duration,
    /// Whether the loop runs at all
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            enabled: true,
        }
    }
}

/// Handle for controlling the background refresh loop
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Spawns the refresh loop on the current runtime
    ///
    /// # Arguments
    /// * `refresher` - Does the actual work each tick
    /// * `config` - Interval and on/off switch
    ///
    /// # Returns
    /// A RefreshHandle that receives progress via the `receiver` channel
    pub fn spawn(refresher: Refresher, config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(config.interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let _ = msg_tx.send(RefreshMessage::RefreshStarted).await;
                            let summary = refresher.refresh_all().await;
                            let _ = msg_tx.send(RefreshMessage::RefreshCompleted(summary)).await;
                        }
                        _ = shutdown_rx.recv() => {
                            debug!("Refresh loop shutting down");
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Waits for the next message; `None` once the loop has stopped
    pub async fn recv(&mut self) -> Option<RefreshMessage> {
        self.receiver.recv().await
    }

    /// Stops the refresh loop after the current run
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Checks for pending refresh messages without blocking
///
/// # Returns
/// * `Some(RefreshMessage)` if a message was available
/// * `None` if no messages are pending
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    handle.receiver.try_recv().ok()
}
