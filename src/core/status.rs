//! Session status vocabulary and probe result models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-valued session classification assigned to each endpoint per check
/// cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Expired,
    Unavailable,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Active => "active",
            SessionStatus::Expired => "expired",
            SessionStatus::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// Raw classified outcome of a single probe attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub success: bool,
    pub http_status: u16,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResponse {
    /// A request that completed with an HTTP status.
    pub fn completed(http_status: u16, response_time_ms: u64) -> Self {
        Self {
            success: (200..300).contains(&http_status),
            http_status,
            response_time_ms,
            error: None,
        }
    }

    /// A request cancelled by the probe timeout. Elapsed time is pinned to
    /// the timeout value.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self {
            success: false,
            http_status: 408,
            response_time_ms: timeout_ms,
            error: Some("Timeout".to_string()),
        }
    }

    /// A request that failed below the HTTP layer.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            success: false,
            http_status: 0,
            response_time_ms: 0,
            error: Some(message.into()),
        }
    }

    /// Synthetic result for a probe short-circuited because no auth token
    /// could be resolved. No network call was made.
    pub fn no_token() -> Self {
        Self {
            success: false,
            http_status: 401,
            response_time_ms: 0,
            error: Some("No auth token".to_string()),
        }
    }

    /// Whether this outcome is worth retrying: timeouts, transport errors
    /// and server errors. Auth failures and other well-formed client errors
    /// are terminal.
    pub fn is_transient(&self) -> bool {
        !self.success && (self.http_status == 408 || self.http_status == 0 || self.http_status >= 500)
    }
}

/// Map a raw probe outcome onto the status vocabulary.
pub fn parse_status(response: &ProbeResponse) -> SessionStatus {
    if response.success {
        return SessionStatus::Active;
    }
    match response.http_status {
        401 | 403 => SessionStatus::Expired,
        _ => SessionStatus::Unavailable,
    }
}

/// Terminal per-endpoint result of one check cycle. Never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub endpoint: String,
    pub url: String,
    pub status: SessionStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub last_checked: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
}

/// The single persisted cache blob: one check cycle's results plus the time
/// they were captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCacheEntry {
    pub timestamp: DateTime<Utc>,
    pub results: Vec<ProbeResult>,
}

impl StatusCacheEntry {
    pub fn new(results: Vec<ProbeResult>) -> Self {
        Self {
            timestamp: Utc::now(),
            results,
        }
    }

    /// Valid for consumption only while `now - timestamp <= max_age`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.timestamp <= max_age
    }
}
