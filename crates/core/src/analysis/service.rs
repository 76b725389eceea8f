use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use tickerlens_market_data::{
    default_providers, DataKind, FetchRequest, HealthRegistry, MarketDataError,
    ProviderDescriptor, ProviderRegistry, Ticker,
};

use super::model::{BatchItem, ClearedEntries, FundamentalsSnapshot};
use crate::cache::{CacheEntry, CacheKey, CacheStore, TwoTierCache};
use crate::config::EngineConfig;
use crate::constants::DEFAULT_BATCH_CONCURRENCY;
use crate::errors::{Error, Result};
use crate::indicators::{IndicatorEngine, IndicatorSnapshot, SeriesOrigin};
use crate::single_flight::SingleFlight;

/// Operations exposed to callers of the analysis engine.
#[async_trait]
pub trait AnalysisServiceTrait: Send + Sync {
    /// Indicator snapshot built from the cached or freshly fetched price series.
    async fn get_indicator_snapshot(&self, ticker: &str) -> Result<IndicatorSnapshot>;

    /// Fundamentals from the cache or the first provider that answers.
    async fn get_fundamentals_snapshot(&self, ticker: &str) -> Result<FundamentalsSnapshot>;

    /// Re-fetch bypassing both cache tiers and return the new snapshot.
    ///
    /// Cached entries are only replaced once the fetch succeeds. Fundamentals
    /// are refreshed too, on a best-effort basis.
    async fn refresh(&self, ticker: &str) -> Result<IndicatorSnapshot>;

    /// Drop every cached entry of the ticker from both tiers.
    async fn clear(&self, ticker: &str) -> Result<ClearedEntries>;

    /// Snapshot each ticker independently. Results keep input order and a
    /// failing ticker never aborts the batch.
    async fn analyze_batch(&self, tickers: &[String]) -> Vec<BatchItem>;

    /// Registered providers with their live health.
    fn provider_health(&self) -> Vec<ProviderDescriptor>;
}

/// Cache-first analysis over the provider fallback chain.
pub struct AnalysisService<S: CacheStore + 'static> {
    registry: Arc<ProviderRegistry>,
    cache: Arc<TwoTierCache<S>>,
    flights: SingleFlight<CacheEntry>,
    engine: IndicatorEngine,
    config: EngineConfig,
    batch_concurrency: usize,
}

impl<S: CacheStore + 'static> AnalysisService<S> {
    pub fn new(registry: Arc<ProviderRegistry>, durable: Arc<S>, config: EngineConfig) -> Self {
        Self {
            registry,
            cache: Arc::new(TwoTierCache::new(durable, config.cache.fast_capacity)),
            flights: SingleFlight::new(config.cache.fetch_wait_ceiling),
            engine: IndicatorEngine::new(config.indicators.clone()),
            config,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    /// Build the service over the default provider set for `config`.
    pub fn with_default_providers(durable: Arc<S>, config: EngineConfig) -> Self {
        let health = Arc::new(HealthRegistry::new(config.health.clone()));
        let providers = default_providers(&config.keys, &config.http);
        let registry = ProviderRegistry::new(providers, health, config.registry.clone());
        Self::new(Arc::new(registry), durable, config)
    }

    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &TwoTierCache<S> {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn parse_ticker(&self, raw: &str) -> Result<Ticker> {
        Ticker::parse(raw, self.config.preferred_exchange).map_err(|e| match e {
            MarketDataError::InvalidTicker(_) => Error::InvalidTicker(raw.trim().to_string()),
            other => Error::MarketData(other),
        })
    }

    fn request_for(&self, ticker: Ticker, kind: DataKind) -> (FetchRequest, Duration) {
        match kind {
            DataKind::PriceSeries => (
                FetchRequest::price_series(ticker, self.config.range, self.config.min_series_bars),
                self.config.cache.price_ttl,
            ),
            DataKind::Fundamentals => (
                FetchRequest::fundamentals(ticker),
                self.config.cache.fundamentals_ttl,
            ),
        }
    }

    /// Cache lookup, then a single-flight fetch on a miss.
    ///
    /// With `bypass_cache` both tiers are skipped for the read but still
    /// written on success.
    async fn load(&self, ticker: &Ticker, kind: DataKind, bypass_cache: bool) -> Result<CacheEntry> {
        let key = CacheKey::today(&ticker.symbol, kind);

        if !bypass_cache {
            if let Some(entry) = self.cache.get(&key) {
                return Ok(entry);
            }
        }

        // One flight per cache key, shared by refreshes and cold reads
        let flight_key = key.to_string();

        let (request, ttl) = self.request_for(ticker.clone(), kind);
        let registry = Arc::clone(&self.registry);
        let cache = Arc::clone(&self.cache);

        self.flights
            .run(&flight_key, move || async move {
                if !bypass_cache {
                    // Another flight may have filled the cache since our lookup
                    if let Some(entry) = cache.get(&key) {
                        return Ok(entry);
                    }
                }
                let response = registry.fetch_normalized(&request).await?;
                debug!(
                    "Caching {} for {} from {}",
                    kind, request.ticker, response.provider
                );
                Ok(cache.put(key, response.data, &response.provider, ttl).await)
            })
            .await
    }

    fn snapshot_from(&self, entry: &CacheEntry) -> Result<IndicatorSnapshot> {
        let series = entry.price_series().ok_or_else(|| {
            Error::Unexpected(format!("cache entry {} does not hold a price series", entry.key))
        })?;
        let origin = SeriesOrigin {
            symbol: entry.key.symbol.clone(),
            data_source: entry.source_provider.clone(),
            fetched_at: entry.fetched_at,
            period: self.config.range.period,
            interval: self.config.range.interval,
        };
        self.engine
            .compute(series, origin)
            .ok_or_else(|| Error::Unexpected(format!("empty price series for {}", entry.key)))
    }

    fn fundamentals_from(entry: &CacheEntry) -> Result<FundamentalsSnapshot> {
        let metrics = entry.fundamentals().ok_or_else(|| {
            Error::Unexpected(format!("cache entry {} does not hold fundamentals", entry.key))
        })?;
        Ok(FundamentalsSnapshot {
            symbol: entry.key.symbol.clone(),
            data_source: entry.source_provider.clone(),
            fetched_at: entry.fetched_at,
            metrics: metrics.clone(),
        })
    }
}

#[async_trait]
impl<S: CacheStore + 'static> AnalysisServiceTrait for AnalysisService<S> {
    async fn get_indicator_snapshot(&self, ticker: &str) -> Result<IndicatorSnapshot> {
        let ticker = self.parse_ticker(ticker)?;
        let entry = self.load(&ticker, DataKind::PriceSeries, false).await?;
        self.snapshot_from(&entry)
    }

    async fn get_fundamentals_snapshot(&self, ticker: &str) -> Result<FundamentalsSnapshot> {
        let ticker = self.parse_ticker(ticker)?;
        let entry = self.load(&ticker, DataKind::Fundamentals, false).await?;
        Self::fundamentals_from(&entry)
    }

    async fn refresh(&self, ticker: &str) -> Result<IndicatorSnapshot> {
        let ticker = self.parse_ticker(ticker)?;
        info!("Refreshing {}", ticker);

        let entry = self.load(&ticker, DataKind::PriceSeries, true).await?;
        let snapshot = self.snapshot_from(&entry)?;

        if let Err(e) = self.load(&ticker, DataKind::Fundamentals, true).await {
            warn!("Fundamentals refresh for {} failed, keeping cached copy: {}", ticker, e);
        }

        Ok(snapshot)
    }

    async fn clear(&self, ticker: &str) -> Result<ClearedEntries> {
        let ticker = self.parse_ticker(ticker)?;
        let (fast, durable) = self.cache.invalidate_all(&ticker.symbol).await;
        info!(
            "Cleared cache for {} ({} fast, {} durable)",
            ticker, fast, durable
        );
        Ok(ClearedEntries { fast, durable })
    }

    async fn analyze_batch(&self, tickers: &[String]) -> Vec<BatchItem> {
        info!(
            "Analyzing batch of {} tickers (concurrency {})",
            tickers.len(),
            self.batch_concurrency
        );
        stream::iter(tickers.iter().cloned())
            .map(|ticker| async move {
                let result = self.get_indicator_snapshot(&ticker).await;
                if let Err(e) = &result {
                    warn!("Batch item {} failed: {}", ticker, e);
                }
                BatchItem::new(ticker, result)
            })
            .buffered(self.batch_concurrency)
            .collect()
            .await
    }

    fn provider_health(&self) -> Vec<ProviderDescriptor> {
        self.registry.descriptors()
    }
}
