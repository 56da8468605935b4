//! Error types for upstream fetches and cache storage
//!
//! `ApiError` covers everything that can go wrong talking to an upstream
//! market-data API. `CacheError` covers the disk side of the cache; the cache
//! façade turns it into a miss and never hands it to callers.

use thiserror::Error;

/// Errors that can occur when fetching data from an upstream API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure, timeout or undecodable body
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status
    #[error("API request failed with status {status}: {url}")]
    Status { status: u16, url: String },

    /// Upstream answered 2xx but the payload is not what the endpoint promises
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The requested resource does not exist upstream
    #[error("Not found: {0}")]
    NotFound(String),

    /// A caller-supplied parameter is missing or malformed
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    /// HTTP status to report for this error in a response envelope
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Status { status, .. } => *status,
            ApiError::NotFound(_) => 404,
            ApiError::InvalidParameter(_) => 400,
            ApiError::Request(e) => e.status().map(|s| s.as_u16()).unwrap_or(500),
            ApiError::InvalidResponse(_) => 500,
        }
    }

    /// Short category label used in the `error` field of a failure envelope
    pub fn label(&self) -> &'static str {
        match self {
            ApiError::Request(_) | ApiError::Status { .. } => "API request failed",
            ApiError::InvalidResponse(_) => "Invalid upstream response",
            ApiError::NotFound(_) => "Not found",
            ApiError::InvalidParameter(_) => "Invalid parameter",
        }
    }
}

/// Errors that can occur reading or writing the on-disk cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure (permissions, disk full, ...)
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache file exists but does not hold a valid entry
    #[error("Corrupt cache entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}
