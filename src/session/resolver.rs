//! Token and header resolution for probe targets
//!
//! Absence is a normal outcome here: lookups widen scope step by step and
//! never fail, they just come back empty.

use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

use crate::config::BridgeConfig;
use crate::core::{registrable_domain, AuthToken, CookieFilter, CookieRecord, CookieStore};

const PROFILE_HEADER: &str = "Profile-Id";
const SUBSYSTEM_HEADER: &str = "X-Mes-Subsystem";
const SUBSYSTEM_VALUE: &str = "dev-panel";

/// Resolves bearer tokens and endpoint-specific headers from the cookie
/// store.
pub struct TokenResolver {
    store: Arc<dyn CookieStore>,
    config: Arc<BridgeConfig>,
}

impl TokenResolver {
    pub fn new(store: Arc<dyn CookieStore>, config: Arc<BridgeConfig>) -> Self {
        Self { store, config }
    }

    /// Map a target URL onto one of the configured environment domains by
    /// substring match; fall back to the URL's own host.
    fn env_domain(&self, target_url: &str) -> Option<String> {
        self.config
            .endpoints
            .iter()
            .filter_map(|endpoint| {
                Url::parse(&endpoint.url)
                    .ok()
                    .and_then(|url| url.host_str().map(String::from))
            })
            .find(|host| target_url.contains(host.as_str()))
            .or_else(|| {
                Url::parse(target_url)
                    .ok()
                    .and_then(|url| url.host_str().map(String::from))
            })
    }

    /// Locate a non-expired bearer token for the target URL.
    ///
    /// A token that is present but expired (or undecodable) yields `None`;
    /// the probe layer turns that into its no-token short circuit.
    pub async fn resolve_token(&self, target_url: &str) -> Option<String> {
        let cookie = self
            .find_cookie(&self.config.auth_cookie, target_url)
            .await?;
        let token = AuthToken::new(cookie.value);
        if token.is_expired() {
            tracing::debug!(target_url, "auth token found but expired");
            return None;
        }
        Some(token.into_raw())
    }

    /// Endpoint-specific request headers.
    ///
    /// School endpoints carry a profile identifier sourced from the profile
    /// cookie plus a fixed subsystem marker; other environments probe with
    /// the bearer token alone.
    pub async fn resolve_headers(&self, target_url: &str) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();

        let Some(env) = self.env_domain(target_url) else {
            return headers;
        };
        if !env.starts_with("school") {
            return headers;
        }

        if let Some(cookie) = self.find_cookie(&self.config.profile_cookie, target_url).await {
            headers.insert(PROFILE_HEADER.to_string(), cookie.value);
        }
        headers.insert(SUBSYSTEM_HEADER.to_string(), SUBSYSTEM_VALUE.to_string());
        headers
    }

    /// All cookies visible to the target URL, rendered for a `Cookie`
    /// request header.
    pub async fn cookie_header(&self, target_url: &str) -> Option<String> {
        let cookies = self
            .store
            .get_all(&CookieFilter::for_url(target_url))
            .await
            .ok()?;
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|cookie| cookie.to_header_value())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Widening cookie lookup: exact environment domain, registrable
    /// parent, then any domain. Store errors are logged and treated as
    /// absence.
    async fn find_cookie(&self, name: &str, target_url: &str) -> Option<CookieRecord> {
        let env = self.env_domain(target_url)?;
        let parent = registrable_domain(&env);

        let filters = [
            CookieFilter::for_domain(&env).with_name(name),
            CookieFilter::for_domain(&parent).with_name(name),
            CookieFilter::default().with_name(name),
        ];

        for filter in filters {
            match self.store.get_all(&filter).await {
                Ok(found) => {
                    if let Some(cookie) = found.into_iter().next() {
                        return Some(cookie);
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, name, "cookie lookup failed, widening scope");
                }
            }
        }
        None
    }
}
