//! In-memory store implementations, used by tests and embedders

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{filter_cookies, host_of, prefix_policy_violation, KvStore, StoreError};
use crate::core::{CookieFilter, CookieRecord, CookieStore, CookieStoreError, SetOutcome};

/// Cookie jar held entirely in memory.
#[derive(Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<Vec<CookieRecord>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookies(cookies: Vec<CookieRecord>) -> Self {
        Self {
            cookies: Mutex::new(cookies),
        }
    }

    /// Current jar contents, for inspection.
    pub async fn snapshot(&self) -> Vec<CookieRecord> {
        self.cookies.lock().await.clone()
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn get_all(&self, filter: &CookieFilter) -> Result<Vec<CookieRecord>, CookieStoreError> {
        filter_cookies(self.cookies.lock().await.clone(), filter)
    }

    async fn get(&self, url: &str, name: &str) -> Result<Option<CookieRecord>, CookieStoreError> {
        let filter = CookieFilter::for_url(url).with_name(name);
        Ok(self.get_all(&filter).await?.into_iter().next())
    }

    async fn set(&self, cookie: CookieRecord) -> Result<SetOutcome, CookieStoreError> {
        if let Some(reason) = prefix_policy_violation(&cookie) {
            return Ok(SetOutcome::SkippedByPolicy(reason));
        }

        let mut cookies = self.cookies.lock().await;
        cookies.retain(|existing| {
            !(existing.name == cookie.name
                && existing.domain == cookie.domain
                && existing.path == cookie.path)
        });
        cookies.push(cookie);
        Ok(SetOutcome::Written)
    }

    async fn remove(&self, url: &str, name: &str) -> Result<(), CookieStoreError> {
        let host = host_of(url)?;
        let mut cookies = self.cookies.lock().await;
        cookies.retain(|cookie| !(cookie.name == name && cookie.matches_host(&host)));
        Ok(())
    }
}

/// Key-value store held entirely in memory.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}
