//! Tiingo end-of-day prices for NSE listings.
//!
//! Requires `TIINGO_API_KEY`, sent as `Authorization: Token {key}`.
//! Indian tickers are addressed as `nse/{symbol}` in lower case.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::{BarInterval, DataKind, PayloadSchema, RawPayload, SeriesRange, Ticker};
use crate::provider::http::{self, HttpSettings};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

pub const TIINGO_PROVIDER_ID: &str = "TIINGO";

const BASE_URL: &str = "https://api.tiingo.com/tiingo/daily";

pub struct TiingoProvider {
    client: Client,
    api_key: String,
}

impl TiingoProvider {
    pub fn new(api_key: String, http: &HttpSettings) -> Self {
        Self {
            client: http.client(),
            api_key,
        }
    }

    fn url_for(ticker: &Ticker) -> String {
        format!(
            "{}/nse/{}/prices",
            BASE_URL,
            encode(&ticker.symbol.to_ascii_lowercase())
        )
    }
}

fn resample_freq(interval: BarInterval) -> &'static str {
    match interval {
        BarInterval::Daily => "daily",
        BarInterval::Weekly => "weekly",
        BarInterval::Monthly => "monthly",
    }
}

#[async_trait]
impl MarketDataProvider for TiingoProvider {
    fn id(&self) -> &'static str {
        TIINGO_PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        4
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            data_kinds: &[DataKind::PriceSeries],
            requires_api_key: true,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 50,
            burst_capacity: 5,
        }
    }

    async fn get_price_series(
        &self,
        ticker: &Ticker,
        range: SeriesRange,
    ) -> Result<RawPayload, MarketDataError> {
        let start = (Utc::now().date_naive() - ChronoDuration::days(range.period.days()))
            .format("%Y-%m-%d")
            .to_string();
        let url = Self::url_for(ticker);
        debug!("Tiingo request for {} from {}", ticker.symbol, start);

        let body = http::get_json(
            TIINGO_PROVIDER_ID,
            &ticker.symbol,
            self.client
                .get(&url)
                .header(header::AUTHORIZATION, format!("Token {}", self.api_key))
                .header(header::CONTENT_TYPE, "application/json")
                .query(&[
                    ("startDate", start.as_str()),
                    ("resampleFreq", resample_freq(range.interval)),
                ]),
        )
        .await?;

        // An empty array means Tiingo has nothing for the symbol
        if body.as_array().is_some_and(Vec::is_empty) {
            return Err(MarketDataError::no_data(TIINGO_PROVIDER_ID, &ticker.symbol));
        }
        if let Some(detail) = body.get("detail").and_then(Value::as_str) {
            return Err(MarketDataError::malformed(TIINGO_PROVIDER_ID, detail));
        }

        Ok(RawPayload::json(
            TIINGO_PROVIDER_ID,
            PayloadSchema::TiingoDaily,
            body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exchange;

    #[test]
    fn test_url_uses_lowercase_nse_path() {
        let ticker = Ticker::parse("POLYCAB.NS", Exchange::Nse).unwrap();
        assert_eq!(
            TiingoProvider::url_for(&ticker),
            "https://api.tiingo.com/tiingo/daily/nse/polycab/prices"
        );
        assert_eq!(resample_freq(BarInterval::Daily), "daily");
    }
}
