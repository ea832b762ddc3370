//! Concurrent status checking with retry and a time-boxed cache
//!
//! Every endpoint is checked independently; one endpoint failing or
//! retrying never blocks the others. Output order is the configured
//! endpoint order regardless of completion order.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BridgeConfig, Endpoint};
use crate::core::{parse_status, ProbeResponse, ProbeResult, StatusCacheEntry};
use crate::session::Prober;
use crate::store::KvStore;

/// Storage key for the single cached check cycle.
pub const CACHE_KEY: &str = "session_status_cache";

/// Fans the prober out across the configured endpoints and serves results
/// from a time-boxed cache when one is fresh.
pub struct StatusAggregator {
    prober: Arc<dyn Prober>,
    cache: Arc<dyn KvStore>,
    endpoints: Vec<Endpoint>,
    cache_ttl: chrono::Duration,
    max_retries: u32,
}

impl StatusAggregator {
    pub fn new(prober: Arc<dyn Prober>, cache: Arc<dyn KvStore>, config: &BridgeConfig) -> Self {
        Self {
            prober,
            cache,
            endpoints: config.endpoints.clone(),
            cache_ttl: chrono::Duration::seconds(config.cache_ttl_secs as i64),
            max_retries: config.max_retries,
        }
    }

    /// Probe every endpoint concurrently. Always returns exactly one result
    /// per endpoint, in endpoint order.
    pub async fn check_all(&self) -> Vec<ProbeResult> {
        let checks = self.endpoints.iter().map(|endpoint| self.check_single(endpoint));
        futures::future::join_all(checks).await
    }

    /// Serve a fresh cached cycle if one exists, otherwise probe live and
    /// cache the outcome.
    pub async fn check_all_with_cache(&self) -> Vec<ProbeResult> {
        if let Some(cached) = self.load_cached().await {
            tracing::debug!("serving session statuses from cache");
            return cached;
        }
        self.refresh().await
    }

    /// Probe live and persist the results, bypassing any cached cycle.
    pub async fn refresh(&self) -> Vec<ProbeResult> {
        let results = self.check_all().await;
        self.save_cached(&results).await;
        results
    }

    /// One endpoint's full retry pipeline: probe, back off on transient
    /// outcomes, settle on a terminal result.
    async fn check_single(&self, endpoint: &Endpoint) -> ProbeResult {
        let mut attempt: u32 = 0;
        loop {
            let response = self.prober.probe(&endpoint.url).await;

            if response.is_transient() && attempt < self.max_retries {
                let delay = Duration::from_millis(2u64.pow(attempt) * 1000);
                tracing::debug!(
                    endpoint = %endpoint.name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "transient probe failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return self.settle(endpoint, response, attempt);
        }
    }

    fn settle(&self, endpoint: &Endpoint, response: ProbeResponse, retries: u32) -> ProbeResult {
        let status = parse_status(&response);
        ProbeResult {
            endpoint: endpoint.name.clone(),
            url: endpoint.url.clone(),
            status,
            response_time_ms: response.response_time_ms,
            error: response.error,
            last_checked: Utc::now(),
            retry_count: (retries > 0).then_some(retries),
        }
    }

    /// Caching is best effort: read errors, malformed entries and stale
    /// entries all fall through to a live check.
    async fn load_cached(&self) -> Option<Vec<ProbeResult>> {
        let value = match self.cache.get(CACHE_KEY).await {
            Ok(value) => value?,
            Err(err) => {
                tracing::warn!(%err, "failed to read status cache");
                return None;
            }
        };

        let entry: StatusCacheEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(%err, "malformed status cache entry");
                return None;
            }
        };

        if !entry.is_fresh(Utc::now(), self.cache_ttl) {
            tracing::debug!("status cache expired");
            return None;
        }
        Some(entry.results)
    }

    async fn save_cached(&self, results: &[ProbeResult]) {
        let entry = StatusCacheEntry::new(results.to_vec());
        match serde_json::to_value(&entry) {
            Ok(value) => {
                if let Err(err) = self.cache.set(CACHE_KEY, value).await {
                    tracing::warn!(%err, "failed to write status cache");
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to serialize status cache");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionStatus;
    use crate::store::{MemoryKvStore, StoreError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Prober replaying a scripted sequence of outcomes per URL. The last
    /// outcome repeats once the script is exhausted.
    struct ScriptedProber {
        script: Mutex<HashMap<String, VecDeque<ProbeResponse>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProber {
        fn new(script: Vec<(&str, Vec<ProbeResponse>)>) -> Self {
            Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|(url, outcomes)| (url.to_string(), outcomes.into_iter().collect()))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
            }
        }

        async fn call_count(&self) -> usize {
            self.calls.lock().await.len()
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, url: &str) -> ProbeResponse {
            self.calls.lock().await.push(url.to_string());
            let mut script = self.script.lock().await;
            let outcomes = script
                .get_mut(url)
                .unwrap_or_else(|| panic!("unscripted probe url: {url}"));
            if outcomes.len() > 1 {
                outcomes.pop_front().unwrap()
            } else {
                outcomes.front().cloned().expect("empty probe script")
            }
        }
    }

    /// Store whose reads and writes always fail.
    struct BrokenKvStore;

    #[async_trait]
    impl KvStore for BrokenKvStore {
        async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>, StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        async fn set(&self, _key: &str, _value: serde_json::Value) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    fn config_for(endpoints: Vec<Endpoint>) -> BridgeConfig {
        BridgeConfig {
            endpoints,
            ..BridgeConfig::default()
        }
    }

    fn four_endpoints() -> Vec<Endpoint> {
        vec![
            Endpoint::new("Uchebnik DEV", "https://one.example/api"),
            Endpoint::new("Uchebnik TEST", "https://two.example/api"),
            Endpoint::new("School DEV", "https://three.example/api"),
            Endpoint::new("School TEST", "https://four.example/api"),
        ]
    }

    fn aggregator(prober: Arc<ScriptedProber>, cache: Arc<dyn KvStore>, endpoints: Vec<Endpoint>) -> StatusAggregator {
        StatusAggregator::new(prober, cache, &config_for(endpoints))
    }

    #[tokio::test]
    async fn one_result_per_endpoint_in_fixed_order() {
        let prober = Arc::new(ScriptedProber::new(vec![
            ("https://one.example/api", vec![ProbeResponse::completed(200, 10)]),
            ("https://two.example/api", vec![ProbeResponse::completed(200, 10)]),
            ("https://three.example/api", vec![ProbeResponse::completed(200, 10)]),
            ("https://four.example/api", vec![ProbeResponse::completed(200, 10)]),
        ]));
        let agg = aggregator(prober, Arc::new(MemoryKvStore::new()), four_endpoints());

        let results = agg.check_all().await;
        let names: Vec<&str> = results.iter().map(|r| r.endpoint.as_str()).collect();
        assert_eq!(
            names,
            vec!["Uchebnik DEV", "Uchebnik TEST", "School DEV", "School TEST"]
        );
        assert!(results.iter().all(|r| r.status == SessionStatus::Active));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhaustion_backs_off_then_settles_unavailable() {
        let prober = Arc::new(ScriptedProber::new(vec![(
            "https://one.example/api",
            vec![ProbeResponse::timeout(5000)],
        )]));
        let agg = aggregator(
            prober.clone(),
            Arc::new(MemoryKvStore::new()),
            vec![Endpoint::new("Uchebnik DEV", "https://one.example/api")],
        );

        let started = tokio::time::Instant::now();
        let results = agg.check_all().await;
        let elapsed = started.elapsed();

        // Two backoff delays: 1s after the first failure, 2s after the second.
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3500));

        assert_eq!(prober.call_count().await, 3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, SessionStatus::Unavailable);
        assert_eq!(results[0].retry_count, Some(2));
        assert_eq!(results[0].error.as_deref(), Some("Timeout"));
    }

    #[tokio::test]
    async fn auth_failures_are_not_retried() {
        let prober = Arc::new(ScriptedProber::new(vec![(
            "https://one.example/api",
            vec![ProbeResponse::completed(401, 20)],
        )]));
        let agg = aggregator(
            prober.clone(),
            Arc::new(MemoryKvStore::new()),
            vec![Endpoint::new("Uchebnik DEV", "https://one.example/api")],
        );

        let results = agg.check_all().await;
        assert_eq!(prober.call_count().await, 1);
        assert_eq!(results[0].status, SessionStatus::Expired);
        assert_eq!(results[0].retry_count, None);
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_outcomes_settle_independently() {
        let prober = Arc::new(ScriptedProber::new(vec![
            ("https://one.example/api", vec![ProbeResponse::completed(200, 15)]),
            ("https://two.example/api", vec![ProbeResponse::completed(401, 15)]),
            (
                "https://three.example/api",
                vec![
                    ProbeResponse::timeout(5000),
                    ProbeResponse::timeout(5000),
                    ProbeResponse::completed(200, 40),
                ],
            ),
            ("https://four.example/api", vec![ProbeResponse::completed(500, 5)]),
        ]));
        let agg = aggregator(prober, Arc::new(MemoryKvStore::new()), four_endpoints());

        let results = agg.check_all().await;
        assert_eq!(results.len(), 4);

        assert_eq!(results[0].status, SessionStatus::Active);
        assert_eq!(results[0].retry_count, None);

        assert_eq!(results[1].status, SessionStatus::Expired);
        assert_eq!(results[1].retry_count, None);

        assert_eq!(results[2].status, SessionStatus::Active);
        assert_eq!(results[2].retry_count, Some(2));

        assert_eq!(results[3].status, SessionStatus::Unavailable);
        assert_eq!(results[3].retry_count, Some(2));
    }

    #[tokio::test]
    async fn fresh_cache_short_circuits_probing() {
        let prober = Arc::new(ScriptedProber::new(vec![(
            "https://one.example/api",
            vec![ProbeResponse::completed(200, 10)],
        )]));
        let agg = aggregator(
            prober.clone(),
            Arc::new(MemoryKvStore::new()),
            vec![Endpoint::new("Uchebnik DEV", "https://one.example/api")],
        );

        let first = agg.check_all_with_cache().await;
        assert_eq!(prober.call_count().await, 1);

        let second = agg.check_all_with_cache().await;
        assert_eq!(prober.call_count().await, 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn stale_cache_triggers_a_live_cycle() {
        let cache = Arc::new(MemoryKvStore::new());
        let stale = StatusCacheEntry {
            timestamp: Utc::now() - chrono::Duration::minutes(6),
            results: vec![ProbeResult {
                endpoint: "Uchebnik DEV".to_string(),
                url: "https://one.example/api".to_string(),
                status: SessionStatus::Active,
                response_time_ms: 10,
                error: None,
                last_checked: Utc::now() - chrono::Duration::minutes(6),
                retry_count: None,
            }],
        };
        cache
            .set(CACHE_KEY, serde_json::to_value(&stale).unwrap())
            .await
            .unwrap();

        let prober = Arc::new(ScriptedProber::new(vec![(
            "https://one.example/api",
            vec![ProbeResponse::completed(403, 25)],
        )]));
        let agg = aggregator(
            prober.clone(),
            cache,
            vec![Endpoint::new("Uchebnik DEV", "https://one.example/api")],
        );

        let results = agg.check_all_with_cache().await;
        assert_eq!(prober.call_count().await, 1);
        assert_eq!(results[0].status, SessionStatus::Expired);
    }

    #[tokio::test]
    async fn storage_failures_degrade_to_live_probing() {
        let prober = Arc::new(ScriptedProber::new(vec![(
            "https://one.example/api",
            vec![ProbeResponse::completed(200, 10)],
        )]));
        let agg = aggregator(
            prober.clone(),
            Arc::new(BrokenKvStore),
            vec![Endpoint::new("Uchebnik DEV", "https://one.example/api")],
        );

        let results = agg.check_all_with_cache().await;
        assert_eq!(results[0].status, SessionStatus::Active);

        // Every call probes live since nothing could be cached.
        agg.check_all_with_cache().await;
        assert_eq!(prober.call_count().await, 2);
    }
}
