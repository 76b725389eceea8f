//! Twelve Data `time_series` provider.
//!
//! Requires `TWELVE_DATA_API_KEY`. Errors arrive as HTTP 200 with
//! `{"status": "error", "code": ..., "message": ...}`, so the body code is
//! mapped the same way an HTTP status would be.
//!
//! API documentation: https://twelvedata.com/docs#time-series

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{
    BarInterval, DataKind, Exchange, PayloadSchema, RawPayload, SeriesRange, Ticker,
};
use crate::provider::http::{self, HttpSettings};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

pub const TWELVE_DATA_PROVIDER_ID: &str = "TWELVE_DATA";

const BASE_URL: &str = "https://api.twelvedata.com/time_series";

pub struct TwelveDataProvider {
    client: Client,
    api_key: String,
}

impl TwelveDataProvider {
    pub fn new(api_key: String, http: &HttpSettings) -> Self {
        Self {
            client: http.client(),
            api_key,
        }
    }
}

fn interval_code(interval: BarInterval) -> &'static str {
    match interval {
        BarInterval::Daily => "1day",
        BarInterval::Weekly => "1week",
        BarInterval::Monthly => "1month",
    }
}

fn exchange_code(exchange: Exchange) -> &'static str {
    match exchange {
        Exchange::Nse => "XNSE",
        Exchange::Bse => "BSE",
    }
}

/// Map an in-body error to the error an HTTP status would have produced.
fn body_error(symbol: &str, body: &Value) -> Option<MarketDataError> {
    if body.get("status").and_then(Value::as_str) != Some("error") {
        return None;
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let code = body
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok())
        .and_then(|c| StatusCode::from_u16(c).ok());

    Some(match code {
        Some(StatusCode::BAD_REQUEST) if message.to_ascii_lowercase().contains("symbol") => {
            MarketDataError::no_data(TWELVE_DATA_PROVIDER_ID, symbol)
        }
        Some(status) if !status.is_success() && status != StatusCode::BAD_REQUEST => {
            http::status_error(TWELVE_DATA_PROVIDER_ID, symbol, status, None)
        }
        _ => MarketDataError::malformed(TWELVE_DATA_PROVIDER_ID, message),
    })
}

#[async_trait]
impl MarketDataProvider for TwelveDataProvider {
    fn id(&self) -> &'static str {
        TWELVE_DATA_PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        3
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            data_kinds: &[DataKind::PriceSeries],
            requires_api_key: true,
        }
    }

    /// Free tier: 8 requests per minute.
    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 8,
            burst_capacity: 2,
        }
    }

    async fn get_price_series(
        &self,
        ticker: &Ticker,
        range: SeriesRange,
    ) -> Result<RawPayload, MarketDataError> {
        let outputsize = range.period.trading_bars().to_string();
        debug!(
            "Twelve Data request for {} on {}",
            ticker.symbol,
            exchange_code(ticker.exchange)
        );

        let body = http::get_json(
            TWELVE_DATA_PROVIDER_ID,
            &ticker.symbol,
            self.client.get(BASE_URL).query(&[
                ("symbol", ticker.symbol.as_str()),
                ("exchange", exchange_code(ticker.exchange)),
                ("interval", interval_code(range.interval)),
                ("outputsize", outputsize.as_str()),
                ("apikey", self.api_key.as_str()),
                ("format", "JSON"),
                ("order", "ASC"),
            ]),
        )
        .await?;

        if let Some(err) = body_error(&ticker.symbol, &body) {
            warn!("Twelve Data error for {}: {}", ticker.symbol, err);
            return Err(err);
        }

        Ok(RawPayload::json(
            TWELVE_DATA_PROVIDER_ID,
            PayloadSchema::TwelveDataTimeSeries,
            body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RetryClass;

    #[test]
    fn test_body_error_mapping() {
        let body = serde_json::json!({
            "status": "error",
            "code": 429,
            "message": "You have run out of API credits for the current minute."
        });
        let err = body_error("TCS", &body).unwrap();
        assert_eq!(err.retry_class(), RetryClass::RateLimited);

        let body = serde_json::json!({
            "status": "error",
            "code": 400,
            "message": "**symbol** not found: NOPE."
        });
        assert!(matches!(
            body_error("NOPE", &body),
            Some(MarketDataError::NoData { .. })
        ));

        let body = serde_json::json!({"status": "error", "code": 401, "message": "bad key"});
        assert!(matches!(
            body_error("TCS", &body),
            Some(MarketDataError::Unauthorized { .. })
        ));

        let ok = serde_json::json!({"status": "ok", "values": []});
        assert!(body_error("TCS", &ok).is_none());
    }

    #[test]
    fn test_exchange_codes() {
        assert_eq!(exchange_code(Exchange::Nse), "XNSE");
        assert_eq!(exchange_code(Exchange::Bse), "BSE");
        assert_eq!(interval_code(BarInterval::Weekly), "1week");
    }
}
