//! Tickerlens Market Data Crate
//!
//! Fetches daily price history and fundamentals for Indian equities from a
//! prioritized set of providers, and turns whatever they return into one
//! canonical shape.
//!
//! # Overview
//!
//! - Providers: Yahoo Finance (NSE and BSE), Stooq, Twelve Data, Tiingo,
//!   Screener.in
//! - Per-provider token-bucket rate limiting with a bounded wait
//! - Health tracking: healthy, degraded, blocked after a rate limit
//! - Retry with exponential backoff and jitter for transient failures
//! - Normalization of every payload into [`PriceSeries`] or [`FundamentalsMap`]
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |   FetchRequest   |  (ticker, data kind, range)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! | ProviderRegistry | --> |  HealthRegistry  |  (skip blocked providers)
//! +------------------+     +------------------+
//!          |           \
//!          |            +-> RateLimiter        (permit or skip)
//!          v
//! +------------------+
//! |     Provider     |  (Yahoo, Stooq, Twelve Data, ...)
//! +------------------+
//!          |
//!          v  RawPayload
//! +------------------+
//! |    Normalizer    |  (clean, sort, de-duplicate)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | ProviderResponse |  (provider, fetched_at, MarketData)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Ticker`] - Exchange-qualified symbol
//! - [`FetchRequest`] - What to fetch and how many bars are needed
//! - [`RawPayload`] - Provider payload as received
//! - [`MarketData`] - Normalized price series or fundamentals

pub mod errors;
pub mod models;
pub mod normalizer;
pub mod provider;
pub mod registry;

pub use errors::{MarketDataError, RetryClass};

pub use models::{
    BarInterval, DataKind, Exchange, FetchRequest, FundamentalValue, FundamentalsMap,
    HistoryPeriod, MarketData, OhlcvBar, PayloadBody, PayloadSchema, PriceSeries, ProviderId,
    ProviderResponse, RawPayload, SeriesRange, Ticker,
};

pub use normalizer::normalize;

pub use provider::screener::ScreenerProvider;
pub use provider::stooq::StooqProvider;
pub use provider::tiingo::TiingoProvider;
pub use provider::twelve_data::TwelveDataProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::{
    default_providers, HttpSettings, MarketDataProvider, ProviderCapabilities, ProviderKeys,
    RateLimit,
};

pub use registry::{
    AttemptOutcome, BackoffPolicy, FetchDiagnostics, HealthConfig, HealthRegistry,
    HealthSnapshot, HealthState, ProviderAttempt, ProviderDescriptor, ProviderRegistry,
    RateLimiter, RegistryConfig,
};
