//! Consolidated runtime configuration
//!
//! Every fixed list the tool relies on lives here: the probe endpoints, the
//! cookie allow/deny lists and the local target origin. A `config.toml` can
//! override any field; absent one, compiled defaults apply.

use serde::Deserialize;
use std::path::PathBuf;

const ENV_CONFIG_KEY: &str = "SESSIONBRIDGE_CONFIG";

/// A remote endpoint to probe for session validity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Full configuration table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Probe targets, in display order.
    pub endpoints: Vec<Endpoint>,

    /// Local origin cookies are copied onto.
    pub target_origin: String,

    /// Registrable domain cookies are copied from.
    pub source_domain: String,

    /// Cookie names always worth copying.
    pub cookie_allowlist: Vec<String>,

    /// Domain substrings that mark third-party tracking cookies.
    pub domain_denylist: Vec<String>,

    /// Cookie holding the bearer token for probes.
    pub auth_cookie: String,

    /// Cookie holding the profile identifier for School endpoints.
    pub profile_cookie: String,

    pub cache_ttl_secs: u64,
    pub probe_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                Endpoint::new("Uchebnik DEV", "https://uchebnik-dev.mos.ru/user-details/api/user"),
                Endpoint::new("Uchebnik TEST", "https://uchebnik-test.mos.ru/user-details/api/user"),
                Endpoint::new("School DEV", "https://school-dev.mos.ru/v3/userinfo"),
                Endpoint::new("School TEST", "https://school-test.mos.ru/v3/userinfo"),
            ],
            target_origin: "http://localhost:3001".to_string(),
            source_domain: "mos.ru".to_string(),
            cookie_allowlist: [
                "JSESSIONID",
                "session-cookie",
                "profile_id",
                "user_id",
                "eom_session_id",
                "eom_profile_id",
                "aupd_current_role",
                "aupd_token",
                "sudir_sculp",
                "auth_flag",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            domain_denylist: ["google", "yandex", "facebook"]
                .into_iter()
                .map(String::from)
                .collect(),
            auth_cookie: "aupd_token".to_string(),
            profile_cookie: "profile_id".to_string(),
            cache_ttl_secs: 300,
            probe_timeout_secs: 5,
            max_retries: 2,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from disk, falling back to defaults.
    ///
    /// Resolution order: `SESSIONBRIDGE_CONFIG`, then
    /// `<config_dir>/sessionbridge/config.toml`. A malformed file is
    /// reported and ignored rather than aborting the run.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to read config file");
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded config");
                config
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "malformed config file, using defaults");
                Self::default()
            }
        }
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG_KEY) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }

        dirs::config_dir().map(|dir| dir.join("sessionbridge").join("config.toml"))
    }
}

/// Directory holding the cookie jar and the status cache.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("sessionbridge"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_four_endpoints() {
        let config = BridgeConfig::default();
        assert_eq!(config.endpoints.len(), 4);
        assert_eq!(config.endpoints[0].name, "Uchebnik DEV");
        assert_eq!(config.endpoints[3].name, "School TEST");
        assert!(config.cookie_allowlist.contains(&"aupd_token".to_string()));
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let config: BridgeConfig = toml::from_str(
            r#"
            target_origin = "http://localhost:3000"
            max_retries = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.target_origin, "http://localhost:3000");
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.endpoints.len(), 4);
        assert_eq!(config.cache_ttl_secs, 300);
    }

    #[test]
    fn endpoint_tables_parse() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [[endpoints]]
            name = "Local"
            url = "http://127.0.0.1:8080/api/user"
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].url, "http://127.0.0.1:8080/api/user");
    }
}
