//! Cookie model and the cookie store seam

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SameSite policy carried on a cookie
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    NoRestriction,
    #[default]
    Lax,
    Strict,
}

/// A single cookie as read from or written to a cookie store.
///
/// Value-like snapshot: read on demand, never cached beyond the operation
/// that read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,

    /// Scoping domain, possibly broader than the host the cookie was read
    /// for (e.g. `mos.ru` for a cookie visible on `uchebnik-test.mos.ru`).
    pub domain: String,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub http_only: bool,

    #[serde(default)]
    pub same_site: SameSite,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_path() -> String {
    "/".to_string()
}

impl CookieRecord {
    /// Whether this cookie would be sent to the given host.
    ///
    /// A cookie scoped to `mos.ru` matches `uchebnik-test.mos.ru`; the
    /// reverse does not hold.
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.');
        host == domain || host.ends_with(&format!(".{domain}"))
    }

    /// Whether this cookie's scoping domain falls under `registrable`
    /// (equal to it, or a subdomain of it).
    pub fn scoped_within(&self, registrable: &str) -> bool {
        let domain = self.domain.trim_start_matches('.');
        domain == registrable || domain.ends_with(&format!(".{registrable}"))
    }

    /// Render as a `name=value` pair for a `Cookie` request header.
    pub fn to_header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Derive the registrable parent domain of a host (`uchebnik-test.mos.ru`
/// becomes `mos.ru`). Hosts with two or fewer labels are returned as-is.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_start_matches('.');
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        host.to_string()
    } else {
        labels[labels.len() - 2..].join(".")
    }
}

/// Query filter for [`CookieStore::get_all`].
///
/// `url` matches cookies that would be sent to that URL's host; `domain`
/// matches cookies scoped to that domain or any of its subdomains; `name`
/// narrows either to an exact cookie name.
#[derive(Debug, Clone, Default)]
pub struct CookieFilter {
    pub url: Option<String>,
    pub domain: Option<String>,
    pub name: Option<String>,
}

impl CookieFilter {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Outcome of a single cookie write.
///
/// Stores may refuse certain attribute combinations the way browsers do;
/// that is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    Written,
    SkippedByPolicy(String),
}

impl SetOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, SetOutcome::Written)
    }
}

/// Errors from cookie store operations
#[derive(Debug, Error)]
pub enum CookieStoreError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Trait for cookie store backends
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// All cookies matching the filter.
    async fn get_all(&self, filter: &CookieFilter) -> Result<Vec<CookieRecord>, CookieStoreError>;

    /// The cookie that would be sent to `url` under `name`, if any.
    async fn get(&self, url: &str, name: &str) -> Result<Option<CookieRecord>, CookieStoreError>;

    /// Write a cookie, replacing any existing cookie with the same
    /// name/domain/path.
    async fn set(&self, cookie: CookieRecord) -> Result<SetOutcome, CookieStoreError>;

    /// Remove the named cookie as scoped to `url`'s host. Removing a cookie
    /// that does not exist is not an error.
    async fn remove(&self, url: &str, name: &str) -> Result<(), CookieStoreError>;
}
