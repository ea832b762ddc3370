//! Persistence collaborators: the cookie jar and the status cache store

#![allow(dead_code)]

mod file;
mod memory;

pub use file::{FileCookieStore, FileKvStore};
pub use memory::{MemoryCookieStore, MemoryKvStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{CookieFilter, CookieRecord, CookieStoreError};

/// Errors from key-value store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for key-value persistence backends. Holds exactly one key in
/// practice, the status cache entry.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;
}

/// Cookie-prefix rules browsers enforce on writes. A violation makes the
/// write a skip, not an error.
pub(crate) fn prefix_policy_violation(cookie: &CookieRecord) -> Option<String> {
    if cookie.name.starts_with("__Secure-") && !cookie.secure {
        return Some("__Secure- cookie requires the secure flag".to_string());
    }
    if cookie.name.starts_with("__Host-") && (!cookie.secure || cookie.path != "/") {
        return Some("__Host- cookie requires the secure flag and path /".to_string());
    }
    None
}

/// Apply a [`CookieFilter`] to a loaded jar.
pub(crate) fn filter_cookies(
    cookies: Vec<CookieRecord>,
    filter: &CookieFilter,
) -> Result<Vec<CookieRecord>, CookieStoreError> {
    let host = filter.url.as_deref().map(host_of).transpose()?;

    Ok(cookies
        .into_iter()
        .filter(|cookie| {
            if let Some(host) = host.as_deref() {
                if !cookie.matches_host(host) {
                    return false;
                }
            }
            if let Some(domain) = filter.domain.as_deref() {
                if !cookie.scoped_within(domain.trim_start_matches('.')) {
                    return false;
                }
            }
            if let Some(name) = filter.name.as_deref() {
                if cookie.name != name {
                    return false;
                }
            }
            true
        })
        .collect())
}

/// Extract the host component of a URL.
pub(crate) fn host_of(url: &str) -> Result<String, CookieStoreError> {
    let parsed =
        url::Url::parse(url).map_err(|err| CookieStoreError::InvalidUrl(format!("{url}: {err}")))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| CookieStoreError::InvalidUrl(url.to_string()))
}
