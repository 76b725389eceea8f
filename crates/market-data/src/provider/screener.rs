//! Screener.in company page, used as the fundamentals fallback.
//!
//! The page is fetched as HTML and handed to the normalizer untouched; the
//! `#top-ratios` list is parsed there.

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::{DataKind, PayloadSchema, RawPayload, Ticker};
use crate::provider::http::{self, HttpSettings};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

pub const SCREENER_PROVIDER_ID: &str = "SCREENER";

const BASE_URL: &str = "https://www.screener.in";

pub struct ScreenerProvider {
    client: Client,
}

impl ScreenerProvider {
    pub fn new(http: &HttpSettings) -> Self {
        Self {
            client: http.client(),
        }
    }

    fn url_for(ticker: &Ticker) -> String {
        format!(
            "{}/company/{}/consolidated/",
            BASE_URL,
            encode(&ticker.symbol)
        )
    }
}

#[async_trait]
impl MarketDataProvider for ScreenerProvider {
    fn id(&self) -> &'static str {
        SCREENER_PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        2
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            data_kinds: &[DataKind::Fundamentals],
            requires_api_key: false,
        }
    }

    /// Scraped site: keep it slow.
    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 10,
            burst_capacity: 1,
        }
    }

    async fn get_fundamentals(&self, ticker: &Ticker) -> Result<RawPayload, MarketDataError> {
        let url = Self::url_for(ticker);
        debug!("Screener request for {}", ticker.symbol);

        let html = http::get_text(
            SCREENER_PROVIDER_ID,
            &ticker.symbol,
            self.client
                .get(&url)
                .header(header::ACCEPT, "text/html,application/xhtml+xml")
                .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                .header(header::REFERER, BASE_URL),
        )
        .await?;

        Ok(RawPayload::text(
            SCREENER_PROVIDER_ID,
            PayloadSchema::ScreenerHtml,
            html,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exchange;

    #[test]
    fn test_consolidated_url() {
        let ticker = Ticker::parse("tcs.ns", Exchange::Nse).unwrap();
        assert_eq!(
            ScreenerProvider::url_for(&ticker),
            "https://www.screener.in/company/TCS/consolidated/"
        );
    }

    #[test]
    fn test_fundamentals_only() {
        let provider = ScreenerProvider::new(&HttpSettings::default());
        assert!(provider.supports(DataKind::Fundamentals));
        assert!(!provider.supports(DataKind::PriceSeries));
    }
}
