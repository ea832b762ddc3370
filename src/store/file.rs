//! File-backed store implementations
//!
//! Both stores keep plain JSON under the data directory so the files can be
//! inspected and edited by hand.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;

use super::{filter_cookies, host_of, prefix_policy_violation, KvStore, StoreError};
use crate::core::{CookieFilter, CookieRecord, CookieStore, CookieStoreError, SetOutcome};

/// Key-value store persisting each key as `<key>.json` in a directory.
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(&value)?;
        tokio::fs::write(self.path_for(key), bytes).await?;
        Ok(())
    }
}

/// Cookie jar persisted as a flat JSON list of records.
///
/// Writes take a lock around the load-modify-save cycle; reads go straight
/// to the file.
pub struct FileCookieStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<CookieRecord>, CookieStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|err| CookieStoreError::Storage(err.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(CookieStoreError::Storage(err.to_string())),
        }
    }

    async fn save(&self, cookies: &[CookieRecord]) -> Result<(), CookieStoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| CookieStoreError::Storage(err.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(cookies)
            .map_err(|err| CookieStoreError::Storage(err.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|err| CookieStoreError::Storage(err.to_string()))
    }
}

#[async_trait]
impl CookieStore for FileCookieStore {
    async fn get_all(&self, filter: &CookieFilter) -> Result<Vec<CookieRecord>, CookieStoreError> {
        filter_cookies(self.load().await?, filter)
    }

    async fn get(&self, url: &str, name: &str) -> Result<Option<CookieRecord>, CookieStoreError> {
        let filter = CookieFilter::for_url(url).with_name(name);
        Ok(self.get_all(&filter).await?.into_iter().next())
    }

    async fn set(&self, cookie: CookieRecord) -> Result<SetOutcome, CookieStoreError> {
        if let Some(reason) = prefix_policy_violation(&cookie) {
            return Ok(SetOutcome::SkippedByPolicy(reason));
        }

        let _guard = self.write_lock.lock().await;
        let mut cookies = self.load().await?;
        cookies.retain(|existing| {
            !(existing.name == cookie.name
                && existing.domain == cookie.domain
                && existing.path == cookie.path)
        });
        cookies.push(cookie);
        self.save(&cookies).await?;
        Ok(SetOutcome::Written)
    }

    async fn remove(&self, url: &str, name: &str) -> Result<(), CookieStoreError> {
        let host = host_of(url)?;

        let _guard = self.write_lock.lock().await;
        let mut cookies = self.load().await?;
        cookies.retain(|cookie| !(cookie.name == name && cookie.matches_host(&host)));
        self.save(&cookies).await
    }
}
