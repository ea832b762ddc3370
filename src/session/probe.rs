//! Single-attempt endpoint probing

use async_trait::async_trait;
use std::time::{Duration, Instant};

use super::TokenResolver;
use crate::core::ProbeResponse;

/// Trait for probe backends. A probe is a single attempt; retry policy
/// lives in the aggregator.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeResponse;
}

/// HTTP prober issuing one authenticated GET per call.
pub struct HttpProber {
    client: reqwest::Client,
    resolver: TokenResolver,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(resolver: TokenResolver, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            resolver,
            timeout,
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeResponse {
        let Some(token) = self.resolver.resolve_token(url).await else {
            tracing::debug!(url, "no auth token, skipping network probe");
            return ProbeResponse::no_token();
        };

        let mut request = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/json")
            .header("Cache-Control", "no-cache")
            .timeout(self.timeout);

        if let Some(cookies) = self.resolver.cookie_header(url).await {
            request = request.header("Cookie", cookies);
        }
        for (name, value) in self.resolver.resolve_headers(url).await {
            request = request.header(name, value);
        }

        let started = Instant::now();
        match request.send().await {
            Ok(response) => {
                let elapsed = started.elapsed().as_millis() as u64;
                let status = response.status().as_u16();
                tracing::debug!(url, status, elapsed_ms = elapsed, "probe completed");
                ProbeResponse::completed(status, elapsed)
            }
            Err(err) if err.is_timeout() => {
                tracing::debug!(url, "probe timed out");
                ProbeResponse::timeout(self.timeout.as_millis() as u64)
            }
            Err(err) => {
                tracing::debug!(url, %err, "probe transport failure");
                ProbeResponse::transport(err.to_string())
            }
        }
    }
}
