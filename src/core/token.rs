//! Auth token expiry checks
//!
//! Tokens are opaque compact strings in `header.payload.signature` form.
//! Only the payload's `exp` claim is ever inspected; signatures are not
//! verified here, the remote endpoints do that.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    exp: Option<i64>,
}

/// A bearer token sourced from an auth cookie.
#[derive(Debug, Clone)]
pub struct AuthToken {
    raw: String,
}

impl AuthToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_raw(self) -> String {
        self.raw
    }

    /// Decode the payload claims. `None` when the token is not a decodable
    /// three-part compact token.
    fn claims(&self) -> Option<TokenClaims> {
        let payload = self.raw.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// The `exp` claim as a timestamp, if present and decodable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.claims()?.exp?;
        DateTime::from_timestamp(exp, 0)
    }

    /// Whether the token is expired at `now`.
    ///
    /// A token that cannot be decoded is treated as expired (fail-closed);
    /// a decodable token without an `exp` claim is treated as valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.claims() {
            None => true,
            Some(claims) => match claims.exp {
                None => false,
                Some(exp) => match DateTime::from_timestamp(exp, 0) {
                    Some(expires_at) => expires_at < now,
                    None => true,
                },
            },
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> AuthToken {
        let encoded = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        AuthToken::new(format!("eyJhbGciOiJSUzI1NiJ9.{encoded}.c2ln"))
    }

    #[test]
    fn past_exp_is_expired() {
        let token = token_with_payload(r#"{"exp": 1000000000}"#);
        assert!(token.is_expired());
    }

    #[test]
    fn future_exp_is_valid() {
        let exp = (Utc::now() + chrono::Duration::hours(1)).timestamp();
        let token = token_with_payload(&format!(r#"{{"exp": {exp}}}"#));
        assert!(!token.is_expired());
        assert!(token.expires_at().is_some());
    }

    #[test]
    fn missing_exp_is_valid() {
        let token = token_with_payload(r#"{"sub": "user"}"#);
        assert!(!token.is_expired());
        assert!(token.expires_at().is_none());
    }

    #[test]
    fn undecodable_token_is_expired() {
        assert!(AuthToken::new("not-a-token").is_expired());
        assert!(AuthToken::new("a.%%%.c").is_expired());
        assert!(AuthToken::new("").is_expired());
    }

    #[test]
    fn padded_payload_still_decodes() {
        let encoded = base64::engine::general_purpose::URL_SAFE.encode(br#"{"exp": 1000000000}"#);
        let token = AuthToken::new(format!("h.{encoded}.s"));
        assert!(token.is_expired());
    }
}
