//! JSON envelope returned by every service operation
//!
//! `{ success, data?, error?, message?, status?, timestamp, stale?, stale_reason? }`
//! Absent optional fields are omitted from the serialized form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Short error category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// HTTP-style status code of a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Milliseconds since epoch when the response was built
    pub timestamp: i64,
    /// Set when the data was served from cache after the fresh path failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_reason: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Fresh data
    pub fn ok(data: T, timestamp: i64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            status: None,
            timestamp,
            stale: None,
            stale_reason: None,
        }
    }

    /// Previously cached data served because the fresh path failed
    pub fn stale(data: T, reason: impl Into<String>, cached_at: DateTime<Utc>, timestamp: i64) -> Self {
        Self {
            message: Some(format!("Serving cached data from {}", cached_at.to_rfc3339())),
            stale: Some(true),
            stale_reason: Some(reason.into()),
            ..Self::ok(data, timestamp)
        }
    }

    /// Generated stand-in data served when neither upstream nor cache has any
    pub fn placeholder(data: T, reason: impl Into<String>, timestamp: i64) -> Self {
        Self {
            message: Some("Serving placeholder data".to_string()),
            stale: Some(true),
            stale_reason: Some(reason.into()),
            ..Self::ok(data, timestamp)
        }
    }

    /// Failure carrying the default payload so consumers always see the expected shape
    pub fn failure(error: &ApiError, fallback: T, timestamp: i64) -> Self {
        Self {
            success: false,
            data: Some(fallback),
            error: Some(error.label().to_string()),
            message: Some(error.to_string()),
            status: Some(error.status_code()),
            timestamp,
            stale: None,
            stale_reason: None,
        }
    }

    /// Whether the data came from the stale fallback
    pub fn is_stale(&self) -> bool {
        self.stale.unwrap_or(false)
    }
}
