//! Provider registry for orchestrating market data providers.
//!
//! The registry manages multiple providers, handling:
//! - Provider selection by data kind, in ascending priority order
//! - Skipping providers that are blocked after a rate-limit signal
//! - Per-provider token buckets and a per-call timeout
//! - Retry with backoff for transient failures, failover for the rest
//! - Diagnostic tracking of every provider considered

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use super::{
    AttemptOutcome, BackoffPolicy, FetchDiagnostics, HealthRegistry, HealthSnapshot, RateLimiter,
};
use crate::errors::{MarketDataError, RetryClass};
use crate::models::{DataKind, FetchRequest, ProviderId, ProviderResponse, RawPayload};
use crate::normalizer;
use crate::provider::MarketDataProvider;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs for the fallback chain.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    pub backoff: BackoffPolicy,
    /// Upper bound on a single provider call.
    pub call_timeout: Duration,
    /// Longest a caller may wait on a provider's token bucket.
    pub limiter_wait_ceiling: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            limiter_wait_ceiling: super::rate_limiter::DEFAULT_WAIT_CEILING,
        }
    }
}

/// Static description of a registered provider plus its live health.
#[derive(Clone, Debug, Serialize)]
pub struct ProviderDescriptor {
    pub name: &'static str,
    pub priority: u8,
    pub capabilities: Vec<DataKind>,
    pub health: HealthSnapshot,
}

/// Provider registry for orchestrating market data fetching.
pub struct ProviderRegistry {
    /// Sorted by ascending priority.
    providers: Vec<Arc<dyn MarketDataProvider>>,
    rate_limiter: RateLimiter,
    health: Arc<HealthRegistry>,
    backoff: BackoffPolicy,
    call_timeout: Duration,
}

impl ProviderRegistry {
    /// Create a new provider registry.
    ///
    /// Configures a token bucket for each provider from its declared
    /// `rate_limit()`. Health state is injected so it can be shared and
    /// inspected outside the registry.
    pub fn new(
        mut providers: Vec<Arc<dyn MarketDataProvider>>,
        health: Arc<HealthRegistry>,
        config: RegistryConfig,
    ) -> Self {
        providers.sort_by_key(|p| p.priority());

        let rate_limiter = RateLimiter::new(config.limiter_wait_ceiling);
        for provider in &providers {
            rate_limiter.configure(provider.id(), provider.rate_limit());
        }

        info!(
            "Provider registry: {}",
            providers
                .iter()
                .map(|p| format!("{}(p{})", p.id(), p.priority()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self {
            providers,
            rate_limiter,
            health,
            backoff: config.backoff,
            call_timeout: config.call_timeout,
        }
    }

    /// Registered providers, in the order they are tried.
    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }

    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        let snapshots = self.health.snapshot(self.providers.iter().map(|p| p.id()));
        self.providers
            .iter()
            .zip(snapshots)
            .map(|(provider, health)| ProviderDescriptor {
                name: provider.id(),
                priority: provider.priority(),
                capabilities: provider.capabilities().data_kinds.to_vec(),
                health,
            })
            .collect()
    }

    fn capable_providers(&self, kind: DataKind) -> Vec<&Arc<dyn MarketDataProvider>> {
        self.providers.iter().filter(|p| p.supports(kind)).collect()
    }

    /// Fetch a raw payload from the first provider that answers.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<RawPayload, MarketDataError> {
        self.run_chain(request, |_, raw| Ok(raw))
            .await
            .map(|(raw, _)| raw)
    }

    /// Fetch and normalize in one pass.
    ///
    /// Normalization runs inside the attempt loop, so a payload that cannot
    /// be normalized counts as that provider's failure and the chain moves on.
    pub async fn fetch_normalized(
        &self,
        request: &FetchRequest,
    ) -> Result<ProviderResponse, MarketDataError> {
        let (data, provider) = self
            .run_chain(request, |req, raw| normalizer::normalize(&raw, req))
            .await?;

        Ok(ProviderResponse {
            provider: ProviderId::Borrowed(provider),
            fetched_at: Utc::now(),
            data,
        })
    }

    /// Walk the capable providers in priority order until `accept` yields a value.
    async fn run_chain<T, F>(
        &self,
        request: &FetchRequest,
        accept: F,
    ) -> Result<(T, &'static str), MarketDataError>
    where
        F: Fn(&FetchRequest, RawPayload) -> Result<T, MarketDataError>,
    {
        let symbol = request.ticker.symbol.as_str();
        let providers = self.capable_providers(request.data_kind);
        let mut diagnostics = FetchDiagnostics::new();

        if providers.is_empty() {
            warn!("No providers registered for {}", request.data_kind);
        }

        for provider in providers {
            let provider_id = provider.id();

            if self.health.is_blocked(provider_id) {
                debug!("Provider '{}' is blocked, skipping", provider_id);
                diagnostics.record(provider_id, AttemptOutcome::Blocked);
                continue;
            }

            let mut tries: u32 = 0;
            loop {
                if let Err(e) = self.rate_limiter.acquire(provider_id).await {
                    debug!("Provider '{}' skipped: {}", provider_id, e);
                    diagnostics.record(
                        provider_id,
                        AttemptOutcome::Skipped {
                            reason: e.to_string(),
                        },
                    );
                    break;
                }

                tries += 1;
                debug!(
                    "Fetching {} for {} from '{}' (try {})",
                    request.data_kind, symbol, provider_id, tries
                );

                let result = match tokio::time::timeout(self.call_timeout, provider.fetch(request))
                    .await
                {
                    Ok(response) => response.and_then(|raw| accept(request, raw)),
                    Err(_) => Err(MarketDataError::Timeout {
                        provider: provider_id.to_string(),
                    }),
                };

                let error = match result {
                    Ok(value) => {
                        self.health.record_success(provider_id);
                        diagnostics.record(provider_id, AttemptOutcome::Succeeded { tries });
                        info!(
                            "Fetched {} for {} from '{}'. Diagnostics: {}",
                            request.data_kind,
                            symbol,
                            provider_id,
                            diagnostics.summary()
                        );
                        return Ok((value, provider_id));
                    }
                    Err(e) => e,
                };

                match error.retry_class() {
                    RetryClass::Permanent => {
                        debug!(
                            "Permanent error from '{}' for {}: {}, stopping",
                            provider_id, symbol, error
                        );
                        return Err(error);
                    }
                    RetryClass::RateLimited => {
                        let retry_after = match &error {
                            MarketDataError::RateLimited { retry_after, .. } => *retry_after,
                            _ => None,
                        };
                        self.health.record_rate_limited(provider_id, retry_after);
                        diagnostics.record(
                            provider_id,
                            AttemptOutcome::RateLimited {
                                error: error.to_string(),
                            },
                        );
                        break;
                    }
                    RetryClass::Transient => {
                        self.health.record_failure(provider_id, &error.to_string());
                        if tries <= self.backoff.max_retries {
                            let delay = self.backoff.delay(tries);
                            debug!(
                                "Transient error from '{}': {}, retrying in {:?}",
                                provider_id, error, delay
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        warn!(
                            "Provider '{}' failed {} times for {}: {}",
                            provider_id, tries, symbol, error
                        );
                        diagnostics.record(
                            provider_id,
                            AttemptOutcome::Failed {
                                error: error.to_string(),
                                tries,
                            },
                        );
                        break;
                    }
                    RetryClass::Failover => {
                        self.health.record_failure(provider_id, &error.to_string());
                        warn!("Provider '{}' failed for {}: {}", provider_id, symbol, error);
                        diagnostics.record(
                            provider_id,
                            AttemptOutcome::Failed {
                                error: error.to_string(),
                                tries,
                            },
                        );
                        break;
                    }
                    RetryClass::NoCoverage => {
                        debug!("Provider '{}' has no data for {}", provider_id, symbol);
                        diagnostics.record(provider_id, AttemptOutcome::NoData);
                        break;
                    }
                    RetryClass::Skip => {
                        diagnostics.record(
                            provider_id,
                            AttemptOutcome::Skipped {
                                reason: error.to_string(),
                            },
                        );
                        break;
                    }
                }
            }
        }

        if diagnostics.all_no_data() {
            info!(
                "No provider has {} for {}. Diagnostics: {}",
                request.data_kind,
                symbol,
                diagnostics.summary()
            );
            return Err(MarketDataError::TickerNotFound(symbol.to_string()));
        }

        warn!(
            "All providers exhausted for {} ({}). Diagnostics: {}",
            symbol,
            request.data_kind,
            diagnostics.summary()
        );
        Err(MarketDataError::AllProvidersExhausted {
            symbol: symbol.to_string(),
            attempts: diagnostics.into_attempts(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exchange, MarketData, PayloadSchema, SeriesRange, Ticker};
    use crate::provider::{ProviderCapabilities, RateLimit};
    use crate::registry::HealthState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Transient,
        TransientThenSucceed(usize),
        RateLimited,
        NotFound,
        NoData,
        Garbage,
        Hang,
    }

    struct MockProvider {
        id: &'static str,
        priority: u8,
        kinds: &'static [DataKind],
        call_count: AtomicUsize,
        behavior: Behavior,
    }

    impl MockProvider {
        fn new(id: &'static str, priority: u8, behavior: Behavior) -> Self {
            Self {
                id,
                priority,
                kinds: &[DataKind::PriceSeries],
                call_count: AtomicUsize::new(0),
                behavior,
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    fn tiingo_rows() -> serde_json::Value {
        serde_json::json!([
            {"date": "2024-01-02T00:00:00.000Z", "open": 100.0, "high": 102.0, "low": 99.0, "close": 101.0, "volume": 1000},
            {"date": "2024-01-03T00:00:00.000Z", "open": 101.0, "high": 103.0, "low": 100.0, "close": 102.0, "volume": 1100},
            {"date": "2024-01-04T00:00:00.000Z", "open": 102.0, "high": 104.0, "low": 101.0, "close": 103.0, "volume": 1200}
        ])
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                data_kinds: self.kinds,
                requires_api_key: false,
            }
        }

        fn rate_limit(&self) -> RateLimit {
            RateLimit {
                requests_per_minute: 6000,
                burst_capacity: 100,
            }
        }

        async fn get_price_series(
            &self,
            _ticker: &Ticker,
            _range: SeriesRange,
        ) -> Result<RawPayload, MarketDataError> {
            let call = self.call_count.fetch_add(1, Ordering::SeqCst);

            let transient = || MarketDataError::ProviderError {
                provider: self.id.to_string(),
                message: "HTTP 503".to_string(),
            };

            match self.behavior {
                Behavior::Succeed => Ok(RawPayload::json(
                    self.id,
                    PayloadSchema::TiingoDaily,
                    tiingo_rows(),
                )),
                Behavior::Transient => Err(transient()),
                Behavior::TransientThenSucceed(n) if call < n => Err(transient()),
                Behavior::TransientThenSucceed(_) => Ok(RawPayload::json(
                    self.id,
                    PayloadSchema::TiingoDaily,
                    tiingo_rows(),
                )),
                Behavior::RateLimited => Err(MarketDataError::RateLimited {
                    provider: self.id.to_string(),
                    retry_after: Some(Duration::from_secs(60)),
                }),
                Behavior::NotFound => Err(MarketDataError::TickerNotFound("NOPE".to_string())),
                Behavior::NoData => Err(MarketDataError::no_data(self.id, "TCS")),
                Behavior::Garbage => Ok(RawPayload::json(
                    self.id,
                    PayloadSchema::TiingoDaily,
                    serde_json::json!({"detail": "Error"}),
                )),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Err(transient())
                }
            }
        }
    }

    fn test_config() -> RegistryConfig {
        RegistryConfig {
            backoff: BackoffPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                jitter: 0.0,
            },
            call_timeout: Duration::from_millis(200),
            limiter_wait_ceiling: Duration::from_secs(1),
        }
    }

    fn request() -> FetchRequest {
        FetchRequest::price_series(
            Ticker::parse("TCS", Exchange::Nse).unwrap(),
            SeriesRange::default(),
            2,
        )
    }

    fn registry_of(providers: &[Arc<MockProvider>]) -> (ProviderRegistry, Arc<HealthRegistry>) {
        let health = Arc::new(HealthRegistry::default());
        let providers = providers
            .iter()
            .map(|p| p.clone() as Arc<dyn MarketDataProvider>)
            .collect();
        (
            ProviderRegistry::new(providers, health.clone(), test_config()),
            health,
        )
    }

    #[test]
    fn test_providers_sorted_by_priority() {
        let (registry, _) = registry_of(&[
            Arc::new(MockProvider::new("LOW_PRIORITY", 20, Behavior::Succeed)),
            Arc::new(MockProvider::new("HIGH_PRIORITY", 1, Behavior::Succeed)),
            Arc::new(MockProvider::new("MED_PRIORITY", 5, Behavior::Succeed)),
        ]);

        let ids: Vec<_> = registry.providers().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["HIGH_PRIORITY", "MED_PRIORITY", "LOW_PRIORITY"]);
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::Succeed));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::Succeed));
        let (registry, _) = registry_of(&[a.clone(), b.clone()]);

        let response = registry.fetch_normalized(&request()).await.unwrap();

        assert_eq!(response.provider, "A");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
        match response.data {
            MarketData::PriceSeries(series) => assert_eq!(series.len(), 3),
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blocked_provider_is_never_called() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::Succeed));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::Succeed));
        let (registry, health) = registry_of(&[a.clone(), b.clone()]);

        health.record_rate_limited("A", None);

        let response = registry.fetch_normalized(&request()).await.unwrap();
        assert_eq!(response.provider, "B");
        assert_eq!(a.calls(), 0);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_transient_exhausts_with_one_entry_per_provider() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::Transient));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::Transient));
        let c = Arc::new(MockProvider::new("C", 3, Behavior::Transient));
        let (registry, _) = registry_of(&[a.clone(), b.clone(), c.clone()]);

        let err = registry.fetch(&request()).await.unwrap_err();

        match err {
            MarketDataError::AllProvidersExhausted { symbol, attempts } => {
                assert_eq!(symbol, "TCS");
                assert_eq!(attempts.len(), 3);
                let ids: Vec<_> = attempts.iter().map(|a| a.provider_id.as_ref()).collect();
                assert_eq!(ids, vec!["A", "B", "C"]);
                assert!(attempts
                    .iter()
                    .all(|a| matches!(a.outcome, AttemptOutcome::Failed { tries: 3, .. })));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        // One call plus K=2 retries each
        assert_eq!(a.calls(), 3);
        assert_eq!(b.calls(), 3);
        assert_eq!(c.calls(), 3);
    }

    #[tokio::test]
    async fn test_transient_retry_recovers_on_same_provider() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::TransientThenSucceed(2)));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::Succeed));
        let (registry, health) = registry_of(&[a.clone(), b.clone()]);

        let response = registry.fetch_normalized(&request()).await.unwrap();

        assert_eq!(response.provider, "A");
        assert_eq!(a.calls(), 3);
        assert_eq!(b.calls(), 0);
        assert_eq!(health.recent_failures("A"), 0);
    }

    #[tokio::test]
    async fn test_ticker_not_found_stops_chain() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::NotFound));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::Succeed));
        let (registry, health) = registry_of(&[a.clone(), b.clone()]);

        let err = registry.fetch(&request()).await.unwrap_err();

        assert!(matches!(err, MarketDataError::TickerNotFound(_)));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
        assert_eq!(health.recent_failures("A"), 0);
    }

    #[tokio::test]
    async fn test_coverage_gap_falls_through_to_next_provider() {
        let yahoo = Arc::new(MockProvider::new("YAHOO", 1, Behavior::Transient));
        let stooq = Arc::new(MockProvider::new("STOOQ", 2, Behavior::NoData));
        let bse = Arc::new(MockProvider::new("YAHOO_BSE", 5, Behavior::Succeed));
        let (registry, health) = registry_of(&[yahoo.clone(), stooq.clone(), bse.clone()]);

        let response = registry.fetch_normalized(&request()).await.unwrap();

        assert_eq!(response.provider, "YAHOO_BSE");
        assert_eq!(stooq.calls(), 1);
        assert_eq!(bse.calls(), 1);
        assert_eq!(health.recent_failures("STOOQ"), 0);
    }

    #[tokio::test]
    async fn test_no_data_everywhere_is_not_found() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::NoData));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::NoData));
        let (registry, _) = registry_of(&[a.clone(), b.clone()]);

        let err = registry.fetch(&request()).await.unwrap_err();

        assert!(matches!(err, MarketDataError::TickerNotFound(ref s) if s == "TCS"));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_data_with_other_failures_exhausts() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::NoData));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::Garbage));
        let (registry, _) = registry_of(&[a, b]);

        let err = registry.fetch_normalized(&request()).await.unwrap_err();

        match err {
            MarketDataError::AllProvidersExhausted { attempts, .. } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].outcome, AttemptOutcome::NoData);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limited_provider_blocked_and_skipped() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::RateLimited));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::Succeed));
        let (registry, health) = registry_of(&[a.clone(), b.clone()]);

        registry.fetch(&request()).await.unwrap();
        assert_eq!(a.calls(), 1);
        assert!(health.is_blocked("A"));

        // Second fetch never touches A
        registry.fetch(&request()).await.unwrap();
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_payload_fails_over() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::Garbage));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::Succeed));
        let (registry, health) = registry_of(&[a.clone(), b.clone()]);

        let response = registry.fetch_normalized(&request()).await.unwrap();

        assert_eq!(response.provider, "B");
        assert_eq!(a.calls(), 1);
        assert_eq!(health.recent_failures("A"), 1);
    }

    #[tokio::test]
    async fn test_hanging_provider_times_out() {
        let a = Arc::new(MockProvider::new("A", 1, Behavior::Hang));
        let b = Arc::new(MockProvider::new("B", 2, Behavior::Succeed));
        let health = Arc::new(HealthRegistry::default());
        let providers: Vec<Arc<dyn MarketDataProvider>> = vec![a, b];
        let registry = ProviderRegistry::new(
            providers,
            health,
            RegistryConfig {
                backoff: BackoffPolicy::none(),
                call_timeout: Duration::from_millis(20),
                limiter_wait_ceiling: Duration::from_secs(1),
            },
        );

        let response = registry.fetch_normalized(&request()).await.unwrap();
        assert_eq!(response.provider, "B");
    }

    #[tokio::test]
    async fn test_no_capable_providers() {
        let (registry, _) = registry_of(&[Arc::new(MockProvider::new(
            "PRICES_ONLY",
            1,
            Behavior::Succeed,
        ))]);

        let request = FetchRequest::fundamentals(Ticker::parse("TCS", Exchange::Nse).unwrap());
        let err = registry.fetch(&request).await.unwrap_err();

        match err {
            MarketDataError::AllProvidersExhausted { ref attempts, .. } => {
                assert!(attempts.is_empty())
            }
            ref other => panic!("expected exhaustion, got {:?}", other),
        }
        assert!(err.to_string().ends_with("no capable providers"));
    }

    #[test]
    fn test_descriptors_report_health() {
        let (registry, health) = registry_of(&[
            Arc::new(MockProvider::new("A", 1, Behavior::Succeed)),
            Arc::new(MockProvider::new("B", 2, Behavior::Succeed)),
        ]);
        health.record_rate_limited("B", None);

        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "A");
        assert_eq!(descriptors[0].capabilities, vec![DataKind::PriceSeries]);
        assert_eq!(descriptors[1].health.state, HealthState::Blocked);
    }
}
