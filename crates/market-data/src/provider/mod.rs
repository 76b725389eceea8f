//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities and rate limiting configuration
//! - Concrete providers for Indian equities (Yahoo, Stooq, Twelve Data,
//!   Tiingo, Screener.in)
//!
//! Providers only fetch. They return the payload as received and classify
//! transport failures into [`MarketDataError`](crate::errors::MarketDataError);
//! ordering, retries and health live in the registry.

mod capabilities;
mod http;
mod traits;

pub mod screener;
pub mod stooq;
pub mod tiingo;
pub mod twelve_data;
pub mod yahoo;

use std::sync::Arc;

use log::info;

pub use capabilities::{ProviderCapabilities, RateLimit};
pub use http::HttpSettings;
pub use traits::MarketDataProvider;

/// API keys for the providers that need one.
#[derive(Clone, Debug, Default)]
pub struct ProviderKeys {
    pub twelve_data: Option<String>,
    pub tiingo: Option<String>,
}

/// Build the default provider set.
///
/// Providers whose key is missing are left out entirely.
pub fn default_providers(
    keys: &ProviderKeys,
    http: &HttpSettings,
) -> Vec<Arc<dyn MarketDataProvider>> {
    let mut providers: Vec<Arc<dyn MarketDataProvider>> = vec![
        Arc::new(yahoo::YahooProvider::new(http)),
        Arc::new(stooq::StooqProvider::new(http)),
        Arc::new(screener::ScreenerProvider::new(http)),
    ];

    match keys.twelve_data.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            providers.push(Arc::new(twelve_data::TwelveDataProvider::new(
                key.to_string(),
                http,
            )));
        }
        _ => info!("TWELVE_DATA_API_KEY not set, Twelve Data will be skipped"),
    }

    match keys.tiingo.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            providers.push(Arc::new(tiingo::TiingoProvider::new(key.to_string(), http)));
        }
        _ => info!("TIINGO_API_KEY not set, Tiingo will be skipped"),
    }

    providers.push(Arc::new(yahoo::YahooProvider::bse(http)));
    providers
}
