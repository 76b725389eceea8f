//! Tests for AnalysisService contracts.
//!
//! Providers are scripted mocks; the durable tier is the in-memory store or
//! a store that always fails.

#[cfg(test)]
mod tests {
    use crate::analysis::{AnalysisService, AnalysisServiceTrait, BatchOutcome, ClearedEntries};
    use crate::cache::{CacheEntry, CacheKey, CacheStore, MemoryCacheStore};
    use crate::config::EngineConfig;
    use crate::errors::{Error, Result};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tickerlens_market_data::{
        BackoffPolicy, DataKind, HealthRegistry, MarketDataError, MarketDataProvider,
        PayloadSchema, ProviderCapabilities, ProviderRegistry, RateLimit, RawPayload,
        RegistryConfig, SeriesRange, Ticker,
    };

    // =========================================================================
    // Mock provider
    // =========================================================================

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Transient,
        NotFound,
    }

    struct MockProvider {
        id: &'static str,
        priority: u8,
        kinds: &'static [DataKind],
        behavior: Behavior,
        delay: Duration,
        failing: AtomicBool,
        price_calls: AtomicUsize,
        fundamentals_calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(id: &'static str, priority: u8, behavior: Behavior) -> Self {
            Self {
                id,
                priority,
                kinds: &[DataKind::PriceSeries, DataKind::Fundamentals],
                behavior,
                delay: Duration::ZERO,
                failing: AtomicBool::new(false),
                price_calls: AtomicUsize::new(0),
                fundamentals_calls: AtomicUsize::new(0),
            }
        }

        fn price_only(mut self) -> Self {
            self.kinds = &[DataKind::PriceSeries];
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn price_calls(&self) -> usize {
            self.price_calls.load(Ordering::SeqCst)
        }

        fn fundamentals_calls(&self) -> usize {
            self.fundamentals_calls.load(Ordering::SeqCst)
        }

        fn outcome(&self, ticker: &Ticker) -> std::result::Result<(), MarketDataError> {
            if ticker.symbol == "MISSING" {
                return Err(MarketDataError::TickerNotFound(ticker.symbol.clone()));
            }
            let transient = MarketDataError::ProviderError {
                provider: self.id.to_string(),
                message: "HTTP 503".to_string(),
            };
            if self.failing.load(Ordering::SeqCst) {
                return Err(transient);
            }
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Transient => Err(transient),
                Behavior::NotFound => Err(MarketDataError::TickerNotFound(ticker.symbol.clone())),
            }
        }
    }

    fn tiingo_rows(bars: usize) -> serde_json::Value {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows: Vec<_> = (0..bars)
            .map(|i| {
                let day = start + chrono::Duration::days(i as i64);
                let close = 100.0 + i as f64;
                serde_json::json!({
                    "date": format!("{}T00:00:00.000Z", day.format("%Y-%m-%d")),
                    "open": close - 0.5,
                    "high": close + 1.0,
                    "low": close - 1.0,
                    "close": close,
                    "volume": 1000 + i,
                })
            })
            .collect();
        serde_json::Value::Array(rows)
    }

    fn quote_summary() -> serde_json::Value {
        serde_json::json!({
            "quoteSummary": {
                "result": [{
                    "summaryDetail": {
                        "maxAge": 1,
                        "trailingPE": {"raw": 28.4, "fmt": "28.40"},
                        "marketCap": {"raw": 1.4e13, "fmt": "14T"}
                    }
                }],
                "error": null
            }
        })
    }

    #[async_trait]
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
            ticker: &Ticker,
            _range: SeriesRange,
        ) -> std::result::Result<RawPayload, MarketDataError> {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome(ticker)?;
            Ok(RawPayload::json(
                self.id,
                PayloadSchema::TiingoDaily,
                tiingo_rows(60),
            ))
        }

        async fn get_fundamentals(
            &self,
            ticker: &Ticker,
        ) -> std::result::Result<RawPayload, MarketDataError> {
            self.fundamentals_calls.fetch_add(1, Ordering::SeqCst);
            self.outcome(ticker)?;
            Ok(RawPayload::json(
                self.id,
                PayloadSchema::YahooQuoteSummary,
                quote_summary(),
            ))
        }
    }

    // =========================================================================
    // Durable store that is always down
    // =========================================================================

    struct UnavailableStore;

    #[async_trait]
    impl CacheStore for UnavailableStore {
        fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>> {
            Err(Error::CacheUnavailable("database locked".to_string()))
        }

        async fn put(&self, _entry: &CacheEntry) -> Result<()> {
            Err(Error::CacheUnavailable("database locked".to_string()))
        }

        async fn delete(&self, _key: &CacheKey) -> Result<()> {
            Err(Error::CacheUnavailable("database locked".to_string()))
        }

        async fn delete_prefix(&self, _prefix: &str) -> Result<usize> {
            Err(Error::CacheUnavailable("database locked".to_string()))
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn engine_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.registry = RegistryConfig {
            backoff: BackoffPolicy::none(),
            call_timeout: Duration::from_secs(2),
            limiter_wait_ceiling: Duration::from_secs(1),
        };
        config
    }

    fn build_service<S: CacheStore + 'static>(
        providers: &[Arc<MockProvider>],
        store: Arc<S>,
    ) -> (AnalysisService<S>, Arc<HealthRegistry>) {
        let health = Arc::new(HealthRegistry::default());
        let providers = providers
            .iter()
            .map(|p| p.clone() as Arc<dyn MarketDataProvider>)
            .collect();
        let config = engine_config();
        let registry = ProviderRegistry::new(providers, health.clone(), config.registry.clone());
        (
            AnalysisService::new(Arc::new(registry), store, config),
            health,
        )
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_snapshot_is_computed_from_fetched_series() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let (service, _) = build_service(&[provider.clone()], Arc::new(MemoryCacheStore::new()));

        let snapshot = service.get_indicator_snapshot("tcs.ns").await.unwrap();

        assert_eq!(snapshot.symbol, "TCS");
        assert_eq!(snapshot.data_source, "ALPHA");
        assert_eq!(snapshot.bar_count, 60);
        assert_eq!(snapshot.current_price, 159.0);
        assert!(snapshot.rsi.is_available());
        assert_eq!(snapshot.rsi.value(), Some(&100.0));
    }

    #[tokio::test]
    async fn test_cached_snapshot_does_not_call_providers() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let store = Arc::new(MemoryCacheStore::new());
        let (service, _) = build_service(&[provider.clone()], store.clone());

        let first = service.get_indicator_snapshot("TCS").await.unwrap();
        let second = service.get_indicator_snapshot("TCS").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.price_calls(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let provider = Arc::new(
            MockProvider::new("ALPHA", 1, Behavior::Succeed).with_delay(Duration::from_millis(50)),
        );
        let (service, _) = build_service(&[provider.clone()], Arc::new(MemoryCacheStore::new()));
        let service = Arc::new(service);

        let calls = (0..8).map(|_| {
            let service = service.clone();
            async move { service.get_indicator_snapshot("INFY").await }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(provider.price_calls(), 1);
    }

    #[tokio::test]
    async fn test_blocked_provider_is_never_called() {
        let blocked = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let backup = Arc::new(MockProvider::new("BETA", 2, Behavior::Succeed));
        let (service, health) = build_service(
            &[blocked.clone(), backup.clone()],
            Arc::new(MemoryCacheStore::new()),
        );
        health.record_rate_limited("ALPHA", Some(Duration::from_secs(60)));

        let snapshot = service.get_indicator_snapshot("TCS").await.unwrap();

        assert_eq!(snapshot.data_source, "BETA");
        assert_eq!(blocked.price_calls(), 0);
        assert_eq!(backup.price_calls(), 1);
    }

    #[tokio::test]
    async fn test_all_transient_failures_exhaust_with_one_entry_per_provider() {
        let a = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Transient));
        let b = Arc::new(MockProvider::new("BETA", 2, Behavior::Transient));
        let (service, _) = build_service(&[a, b], Arc::new(MemoryCacheStore::new()));

        let err = service.get_indicator_snapshot("TCS").await.unwrap_err();

        let attempts = err.attempts().expect("exhaustion carries attempts");
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].provider_id, "ALPHA");
        assert_eq!(attempts[1].provider_id, "BETA");
    }

    #[tokio::test]
    async fn test_not_found_stops_the_chain() {
        let a = Arc::new(MockProvider::new("ALPHA", 1, Behavior::NotFound));
        let b = Arc::new(MockProvider::new("BETA", 2, Behavior::Succeed));
        let (service, _) = build_service(&[a.clone(), b.clone()], Arc::new(MemoryCacheStore::new()));

        let err = service.get_indicator_snapshot("TCS").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(a.price_calls(), 1);
        assert_eq!(b.price_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_ticker_is_rejected_before_any_fetch() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let (service, _) = build_service(&[provider.clone()], Arc::new(MemoryCacheStore::new()));

        let err = service.get_indicator_snapshot("BAD/SYMBOL").await.unwrap_err();

        assert!(matches!(err, Error::InvalidTicker(_)));
        assert_eq!(provider.price_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let (service, _) = build_service(&[provider.clone()], Arc::new(MemoryCacheStore::new()));

        let before = service.get_indicator_snapshot("TCS").await.unwrap();
        provider.set_failing(true);

        assert!(service.refresh("TCS").await.is_err());
        let after = service.get_indicator_snapshot("TCS").await.unwrap();

        assert_eq!(before, after);
        assert_eq!(provider.price_calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache_and_refetches_fundamentals() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let (service, _) = build_service(&[provider.clone()], Arc::new(MemoryCacheStore::new()));

        let before = service.get_indicator_snapshot("TCS").await.unwrap();
        let refreshed = service.refresh("TCS").await.unwrap();

        assert_eq!(provider.price_calls(), 2);
        assert_eq!(provider.fundamentals_calls(), 1);
        assert!(refreshed.fetched_at >= before.fetched_at);

        // The refreshed entry now serves reads
        let after = service.get_indicator_snapshot("TCS").await.unwrap();
        assert_eq!(after.fetched_at, refreshed.fetched_at);
        assert_eq!(provider.price_calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_and_cold_read_share_one_fetch() {
        let provider = Arc::new(
            MockProvider::new("ALPHA", 1, Behavior::Succeed).with_delay(Duration::from_millis(100)),
        );
        let (service, _) = build_service(&[provider.clone()], Arc::new(MemoryCacheStore::new()));

        let (refreshed, read) = tokio::join!(
            service.refresh("INFY"),
            service.get_indicator_snapshot("INFY")
        );

        assert_eq!(refreshed.unwrap(), read.unwrap());
        assert_eq!(provider.price_calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_succeeds_when_fundamentals_are_unavailable() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed).price_only());
        let (service, _) = build_service(&[provider.clone()], Arc::new(MemoryCacheStore::new()));

        assert!(service.refresh("TCS").await.is_ok());
        assert_eq!(provider.fundamentals_calls(), 0);
    }

    #[tokio::test]
    async fn test_clear_empties_both_tiers() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let store = Arc::new(MemoryCacheStore::new());
        let (service, _) = build_service(&[provider.clone()], store.clone());

        service.get_indicator_snapshot("TCS").await.unwrap();
        service.get_fundamentals_snapshot("TCS").await.unwrap();
        service.get_indicator_snapshot("INFY").await.unwrap();

        let cleared = service.clear("tcs").await.unwrap();

        assert_eq!(cleared, ClearedEntries { fast: 2, durable: 2 });
        assert_eq!(store.len(), 1);
        assert!(service
            .cache()
            .get(&CacheKey::today("TCS", DataKind::PriceSeries))
            .is_none());

        service.get_indicator_snapshot("TCS").await.unwrap();
        assert_eq!(provider.price_calls(), 3);
    }

    #[tokio::test]
    async fn test_fundamentals_snapshot_carries_metrics() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let (service, _) = build_service(&[provider.clone()], Arc::new(MemoryCacheStore::new()));

        let snapshot = service.get_fundamentals_snapshot("RELIANCE").await.unwrap();

        assert_eq!(snapshot.symbol, "RELIANCE");
        assert_eq!(snapshot.data_source, "ALPHA");
        assert_eq!(
            snapshot.metrics.get("trailing_pe").and_then(|v| v.as_f64()),
            Some(28.4)
        );
        assert!(snapshot.metrics.get("max_age").is_none());
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_isolates_failures() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let (service, _) = build_service(&[provider.clone()], Arc::new(MemoryCacheStore::new()));
        let service = service.with_batch_concurrency(2);

        let tickers = vec![
            "TCS".to_string(),
            "MISSING".to_string(),
            "".to_string(),
            "INFY".to_string(),
        ];
        let items = service.analyze_batch(&tickers).await;

        let names: Vec<_> = items.iter().map(|i| i.ticker.as_str()).collect();
        assert_eq!(names, vec!["TCS", "MISSING", "", "INFY"]);
        assert!(items[0].is_ok());
        assert!(!items[1].is_ok());
        assert!(!items[2].is_ok());
        assert!(items[3].is_ok());
        match &items[1].outcome {
            BatchOutcome::Error { error } => assert!(error.message.contains("MISSING")),
            BatchOutcome::Ok { .. } => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_durable_tier_degrades_to_fast_tier() {
        let provider = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let (service, _) = build_service(&[provider.clone()], Arc::new(UnavailableStore));

        let first = service.get_indicator_snapshot("TCS").await.unwrap();
        let second = service.get_indicator_snapshot("TCS").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.price_calls(), 1);
        assert_eq!(
            service.clear("TCS").await.unwrap(),
            ClearedEntries { fast: 1, durable: 0 }
        );
    }

    #[tokio::test]
    async fn test_provider_health_lists_registered_providers() {
        let a = Arc::new(MockProvider::new("ALPHA", 1, Behavior::Succeed));
        let b = Arc::new(MockProvider::new("BETA", 2, Behavior::Succeed).price_only());
        let (service, health) = build_service(&[b, a], Arc::new(MemoryCacheStore::new()));
        health.record_rate_limited("BETA", None);

        let descriptors = service.provider_health();

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "ALPHA");
        assert_eq!(descriptors[1].name, "BETA");
        assert_eq!(descriptors[1].capabilities, vec![DataKind::PriceSeries]);
        assert_eq!(
            descriptors[1].health.state,
            tickerlens_market_data::HealthState::Blocked
        );
    }
}
