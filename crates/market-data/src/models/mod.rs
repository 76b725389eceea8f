//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `types` - Identifiers and request shapes (ProviderId, DataKind, Ticker, FetchRequest)
//! - `bar` - Canonical OHLCV bars and ordered price series
//! - `fundamentals` - Opaque fundamentals key-value map
//! - `payload` - Raw provider payloads and normalized market data

mod bar;
mod fundamentals;
mod payload;
mod types;

pub use bar::{OhlcvBar, PriceSeries};
pub use fundamentals::{FundamentalValue, FundamentalsMap};
pub use payload::{MarketData, PayloadBody, PayloadSchema, ProviderResponse, RawPayload};
pub use types::{
    BarInterval, DataKind, Exchange, FetchRequest, HistoryPeriod, ProviderId, SeriesRange, Ticker,
};
