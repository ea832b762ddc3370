//! Cookie transfer from a remote origin onto the local target origin

use std::sync::Arc;
use url::Url;

use crate::config::BridgeConfig;
use crate::core::{
    registrable_domain, CookieFilter, CookieRecord, CookieStore, CookieStoreError, SameSite,
    SetOutcome,
};

/// Terminal outcome of a transfer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The source domain had no cookies at all.
    NothingToCopy,
    /// Cookies existed but none survived filtering.
    NothingImportant,
    Copied {
        written: usize,
        skipped: usize,
        total: usize,
    },
}

impl TransferOutcome {
    /// Human-readable summary for the UI surface.
    pub fn message(&self) -> String {
        match self {
            TransferOutcome::NothingToCopy => "No cookies to copy".to_string(),
            TransferOutcome::NothingImportant => "No important cookies to copy".to_string(),
            TransferOutcome::Copied {
                written,
                skipped,
                total,
            } => {
                let mut message = format!("Copied {written} of {total} important cookies");
                if *skipped > 0 {
                    message.push_str(&format!(" ({skipped} skipped by policy)"));
                }
                message
            }
        }
    }
}

/// Copies auth cookies from a remote origin onto the local target origin,
/// normalizing attributes so they work over plain http.
pub struct CookieTransfer {
    store: Arc<dyn CookieStore>,
    config: Arc<BridgeConfig>,
}

impl CookieTransfer {
    pub fn new(store: Arc<dyn CookieStore>, config: Arc<BridgeConfig>) -> Self {
        Self { store, config }
    }

    /// Full transfer: clear the target origin, read everything visible on
    /// the source's registrable domain, filter, rewrite.
    pub async fn transfer(&self, source_origin: &str) -> Result<TransferOutcome, CookieStoreError> {
        self.clear_target().await?;

        let parent = source_parent(source_origin);
        let cookies = self
            .store
            .get_all(&CookieFilter::for_domain(&parent))
            .await?;
        tracing::debug!(source = %parent, count = cookies.len(), "read source cookies");

        if cookies.is_empty() {
            return Ok(TransferOutcome::NothingToCopy);
        }

        let selected = self.select_important(cookies, &parent);
        if selected.is_empty() {
            return Ok(TransferOutcome::NothingImportant);
        }

        self.write_to_target(selected).await
    }

    /// Narrow variant: exactly the auth token and profile cookies, looked
    /// up on the exact source origin first, then on the registrable parent.
    pub async fn transfer_minimal(
        &self,
        source_origin: &str,
    ) -> Result<TransferOutcome, CookieStoreError> {
        self.clear_target().await?;

        let parent = source_parent(source_origin);
        let names = [
            self.config.auth_cookie.clone(),
            self.config.profile_cookie.clone(),
        ];

        let mut found = Vec::new();
        for name in &names {
            match self.store.get(source_origin, name).await? {
                Some(cookie) => found.push(cookie),
                None => {
                    let fallback = self
                        .store
                        .get_all(&CookieFilter::for_domain(&parent).with_name(name))
                        .await?;
                    if let Some(cookie) = fallback.into_iter().next() {
                        found.push(cookie);
                    } else {
                        tracing::debug!(%name, "cookie not found on source or parent domain");
                    }
                }
            }
        }

        if found.is_empty() {
            return Ok(TransferOutcome::NothingToCopy);
        }
        self.write_to_target(found).await
    }

    /// Keep allow-listed names and anything scoped to the source domain;
    /// drop known third-party tracking domains.
    fn select_important(&self, cookies: Vec<CookieRecord>, parent: &str) -> Vec<CookieRecord> {
        let total = cookies.len();
        let selected: Vec<CookieRecord> = cookies
            .into_iter()
            .filter(|cookie| {
                self.config.cookie_allowlist.contains(&cookie.name)
                    || cookie.scoped_within(parent)
            })
            .filter(|cookie| {
                let denied = self
                    .config
                    .domain_denylist
                    .iter()
                    .any(|fragment| cookie.domain.contains(fragment.as_str()));
                if denied {
                    tracing::debug!(name = %cookie.name, domain = %cookie.domain, "skipping tracking cookie");
                }
                !denied
            })
            .collect();

        tracing::debug!(total, selected = selected.len(), "filtered source cookies");
        selected
    }

    /// Rewrite each cookie onto the target origin. Per-cookie policy
    /// refusals and write errors are tallied, never fatal.
    async fn write_to_target(
        &self,
        cookies: Vec<CookieRecord>,
    ) -> Result<TransferOutcome, CookieStoreError> {
        let target = self.target_url()?;
        let target_host = target
            .host_str()
            .ok_or_else(|| CookieStoreError::InvalidUrl(self.config.target_origin.clone()))?
            .to_string();

        let total = cookies.len();
        let mut written = 0;
        let mut skipped = 0;

        for cookie in cookies {
            let normalized = CookieRecord {
                name: cookie.name.clone(),
                value: cookie.value,
                domain: target_host.clone(),
                path: if cookie.path.is_empty() {
                    "/".to_string()
                } else {
                    cookie.path
                },
                // The target is plain http; secure cookies would never be
                // sent there, and strict same-site breaks local redirects.
                secure: false,
                http_only: cookie.http_only,
                same_site: SameSite::Lax,
                expires_at: cookie.expires_at,
            };

            match self.store.set(normalized).await {
                Ok(SetOutcome::Written) => written += 1,
                Ok(SetOutcome::SkippedByPolicy(reason)) => {
                    tracing::debug!(name = %cookie.name, %reason, "cookie refused by policy");
                    skipped += 1;
                }
                Err(err) => {
                    tracing::warn!(name = %cookie.name, %err, "cookie write failed");
                    skipped += 1;
                }
            }
        }

        tracing::info!(written, skipped, total, "cookie transfer finished");
        Ok(TransferOutcome::Copied {
            written,
            skipped,
            total,
        })
    }

    /// Remove whatever is currently set on the target origin, over both
    /// scheme variants, so stale values never shadow fresh ones.
    async fn clear_target(&self) -> Result<(), CookieStoreError> {
        let mut existing = Vec::new();
        for origin in self.target_variants()? {
            existing.extend(
                self.store
                    .get_all(&CookieFilter::for_url(origin.as_str()))
                    .await?,
            );
        }
        existing.sort_by(|a, b| (&a.name, &a.path).cmp(&(&b.name, &b.path)));
        existing.dedup_by(|a, b| a.name == b.name && a.path == b.path);

        tracing::debug!(count = existing.len(), "clearing target origin cookies");
        for cookie in existing {
            let scheme = if cookie.secure { "https" } else { "http" };
            let mut url = self.target_url()?;
            if url.set_scheme(scheme).is_err() {
                continue;
            }
            url.set_path(&cookie.path);
            if let Err(err) = self.store.remove(url.as_str(), &cookie.name).await {
                tracing::warn!(name = %cookie.name, %err, "failed to remove stale cookie");
            }
        }
        Ok(())
    }

    fn target_url(&self) -> Result<Url, CookieStoreError> {
        Url::parse(&self.config.target_origin)
            .map_err(|err| CookieStoreError::InvalidUrl(format!("{}: {err}", self.config.target_origin)))
    }

    fn target_variants(&self) -> Result<Vec<Url>, CookieStoreError> {
        let base = self.target_url()?;
        let mut variants = vec![base.clone()];
        let other = if base.scheme() == "https" { "http" } else { "https" };
        let mut alt = base;
        if alt.set_scheme(other).is_ok() {
            variants.push(alt);
        }
        Ok(variants)
    }
}

/// Registrable parent of a source origin given as a URL or bare host.
fn source_parent(source_origin: &str) -> String {
    let host = Url::parse(source_origin)
        .ok()
        .and_then(|url| url.host_str().map(String::from))
        .unwrap_or_else(|| source_origin.trim_matches('/').to_string());
    registrable_domain(&host)
}
