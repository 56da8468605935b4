//! Retrying HTTP fetcher shared by all upstream clients
//!
//! Every outbound call goes through [`retry_with_backoff`]: on failure it
//! sleeps, doubles the delay up to a cap, and tries again until the retry
//! budget is spent, then hands back the last error.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Default per-request timeout for upstream calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Bounded exponential backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    pub retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(10_000),
        }
    }
}

/// Runs `op` until it succeeds or `config.retries` retries have failed
///
/// Delays between attempts are `initial_backoff`, then doubled each time and
/// capped at `max_backoff`. The delay is a tokio sleep, so other tasks keep
/// running while this one waits.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut remaining = config.retries;
    let mut backoff = config.initial_backoff;

    loop {
        debug!("{}: attempting request ({} retries left)", label, remaining);

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if remaining == 0 => {
                warn!("{}: giving up after {} attempts: {}", label, config.retries + 1, e);
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "{}: request failed, retrying in {:?} ({} retries left): {}",
                    label, backoff, remaining, e
                );
                tokio::time::sleep(backoff).await;
                remaining -= 1;
                backoff = backoff.saturating_mul(2).min(config.max_backoff);
            }
        }
    }
}

/// JSON-over-HTTP client with a request timeout and retry policy
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration, retry: RetryConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, retry })
    }

    /// Creates a fetcher with a custom HTTP client
    pub fn with_client(client: Client, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// GETs `url` with query parameters and returns the parsed JSON body
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &HeaderMap,
    ) -> Result<Value, ApiError> {
        retry_with_backoff(&self.retry, url, || {
            let request = self
                .client
                .get(url)
                .query(query)
                .headers(headers.clone());
            execute(url, request)
        })
        .await
    }

    /// POSTs a JSON body to `url` and returns the parsed JSON response
    pub async fn post_json(
        &self,
        url: &str,
        body: &Value,
        headers: &HeaderMap,
    ) -> Result<Value, ApiError> {
        retry_with_backoff(&self.retry, url, || {
            let request = self.client.post(url).json(body).headers(headers.clone());
            execute(url, request)
        })
        .await
    }
}

/// One attempt: send, require 2xx, parse JSON
///
/// JSON parsing happens here so a malformed body is retried like any other
/// failure.
async fn execute(url: &str, request: RequestBuilder) -> Result<Value, ApiError> {
    let response = request.header(ACCEPT, "*/*").send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    Ok(response.json::<Value>().await?)
}
