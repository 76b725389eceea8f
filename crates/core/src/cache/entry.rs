use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tickerlens_market_data::{FundamentalsMap, MarketData, PriceSeries};

use super::CacheKey;

/// A cached normalized payload and where it came from.
///
/// Freshness is a timestamp check: an entry read after
/// `fetched_at + ttl` is a miss even if a tier still holds it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: MarketData,
    pub fetched_at: DateTime<Utc>,
    pub source_provider: String,
    pub ttl_seconds: u64,
}

impl CacheEntry {
    pub fn new(
        key: CacheKey,
        payload: MarketData,
        source_provider: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            key,
            payload,
            fetched_at: Utc::now(),
            source_provider: source_provider.into(),
            ttl_seconds: ttl.as_secs(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::seconds(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX));
        self.fetched_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    pub fn price_series(&self) -> Option<&PriceSeries> {
        match &self.payload {
            MarketData::PriceSeries(series) => Some(series),
            MarketData::Fundamentals(_) => None,
        }
    }

    pub fn fundamentals(&self) -> Option<&FundamentalsMap> {
        match &self.payload {
            MarketData::Fundamentals(map) => Some(map),
            MarketData::PriceSeries(_) => None,
        }
    }
}
