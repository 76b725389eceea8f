//! Market data provider trait definitions.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{DataKind, FetchRequest, RawPayload, SeriesRange, Ticker};

use super::capabilities::{ProviderCapabilities, RateLimit};

/// Trait for market data providers.
///
/// Implement this trait to add support for a new upstream source. The
/// registry orders providers by `priority` and routes each request to the
/// ones whose capabilities include the requested [`DataKind`]; nothing in the
/// registry needs to change when a provider is added.
///
/// Providers return payloads exactly as received. Turning them into bars or
/// fundamentals is the normalizer's job.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tickerlens_market_data::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             data_kinds: &[DataKind::PriceSeries],
///             requires_api_key: false,
///         }
///     }
///
///     fn rate_limit(&self) -> RateLimit {
///         RateLimit::default()
///     }
///
///     // ... implement get_price_series
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier such as "YAHOO" or "STOOQ".
    ///
    /// Used for logging, health tracking, rate limiting and diagnostics.
    fn id(&self) -> &'static str;

    /// Lower values are tried first. Default is 10.
    fn priority(&self) -> u8 {
        10
    }

    fn capabilities(&self) -> ProviderCapabilities;

    fn rate_limit(&self) -> RateLimit;

    fn supports(&self, kind: DataKind) -> bool {
        self.capabilities().supports(kind)
    }

    /// Fetch a raw OHLCV payload for the ticker.
    ///
    /// Default implementation returns `NotSupported`.
    async fn get_price_series(
        &self,
        ticker: &Ticker,
        range: SeriesRange,
    ) -> Result<RawPayload, MarketDataError> {
        let _ = (ticker, range);
        Err(MarketDataError::NotSupported {
            operation: DataKind::PriceSeries.to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Fetch a raw fundamentals payload for the ticker.
    ///
    /// Default implementation returns `NotSupported`.
    async fn get_fundamentals(&self, ticker: &Ticker) -> Result<RawPayload, MarketDataError> {
        let _ = ticker;
        Err(MarketDataError::NotSupported {
            operation: DataKind::Fundamentals.to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Dispatch a registry request to the matching operation.
    async fn fetch(&self, request: &FetchRequest) -> Result<RawPayload, MarketDataError> {
        match request.data_kind {
            DataKind::PriceSeries => self.get_price_series(&request.ticker, request.range).await,
            DataKind::Fundamentals => self.get_fundamentals(&request.ticker).await,
        }
    }
}
