//! Stooq daily CSV download.
//!
//! No API key. Indian listings live under `{symbol}.ns`. Unknown symbols
//! come back as HTTP 200 with a "No data" body rather than a 404.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{BarInterval, DataKind, PayloadSchema, RawPayload, SeriesRange, Ticker};
use crate::provider::http::{self, HttpSettings};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

pub const STOOQ_PROVIDER_ID: &str = "STOOQ";

const BASE_URL: &str = "https://stooq.com/q/d/l/";

pub struct StooqProvider {
    client: Client,
}

impl StooqProvider {
    pub fn new(http: &HttpSettings) -> Self {
        Self {
            client: http.client(),
        }
    }
}

fn interval_code(interval: BarInterval) -> &'static str {
    match interval {
        BarInterval::Daily => "d",
        BarInterval::Weekly => "w",
        BarInterval::Monthly => "m",
    }
}

/// Stooq's "no data" answer: a short body or a literal message.
fn is_empty_answer(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.len() < 30 || trimmed.to_ascii_lowercase().contains("no data")
}

#[async_trait]
impl MarketDataProvider for StooqProvider {
    fn id(&self) -> &'static str {
        STOOQ_PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        2
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            data_kinds: &[DataKind::PriceSeries],
            requires_api_key: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 30,
            burst_capacity: 3,
        }
    }

    async fn get_price_series(
        &self,
        ticker: &Ticker,
        range: SeriesRange,
    ) -> Result<RawPayload, MarketDataError> {
        let symbol = format!("{}.ns", ticker.symbol.to_ascii_lowercase());
        let end = Utc::now().date_naive();
        let start = end - ChronoDuration::days(range.period.days());
        let d1 = start.format("%Y%m%d").to_string();
        let d2 = end.format("%Y%m%d").to_string();

        debug!("Stooq request for {} ({} to {})", symbol, d1, d2);

        let body = http::get_text(
            STOOQ_PROVIDER_ID,
            &ticker.symbol,
            self.client.get(BASE_URL).query(&[
                ("s", symbol.as_str()),
                ("d1", d1.as_str()),
                ("d2", d2.as_str()),
                ("i", interval_code(range.interval)),
            ]),
        )
        .await?;

        if is_empty_answer(&body) {
            return Err(MarketDataError::no_data(STOOQ_PROVIDER_ID, &ticker.symbol));
        }

        Ok(RawPayload::text(
            STOOQ_PROVIDER_ID,
            PayloadSchema::StooqCsv,
            body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_detection() {
        assert!(is_empty_answer("No data"));
        assert!(is_empty_answer("   "));
        assert!(!is_empty_answer(
            "Date,Open,High,Low,Close,Volume\n2024-01-02,100,102,99,101,1000\n"
        ));
    }

    #[test]
    fn test_interval_codes() {
        assert_eq!(interval_code(BarInterval::Daily), "d");
        assert_eq!(interval_code(BarInterval::Monthly), "m");
    }
}
