//! Yahoo Finance market data provider.
//!
//! Two registrations share this implementation:
//! - `YAHOO`: the ticker's own listing (NSE by default), price series and
//!   fundamentals
//! - `YAHOO_BSE`: the last-resort price fallback, always on the `.BO` listing
//!
//! Price series come from the `v8/finance/chart` endpoint. Fundamentals come
//! from `v10/finance/quoteSummary`, which needs a crumb/cookie pair.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::{DataKind, Exchange, PayloadSchema, RawPayload, SeriesRange, Ticker};
use crate::provider::http::{self, HttpSettings};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

pub const YAHOO_PROVIDER_ID: &str = "YAHOO";
pub const YAHOO_BSE_PROVIDER_ID: &str = "YAHOO_BSE";

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData";

// ============================================================================
// Crumb/Cookie Authentication
// ============================================================================

#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

// ============================================================================
// Yahoo Provider
// ============================================================================

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    id: &'static str,
    priority: u8,
    /// Listing to use regardless of the ticker's own exchange.
    forced_exchange: Option<Exchange>,
    client: Client,
    crumb: RwLock<Option<CrumbData>>,
}

impl YahooProvider {
    /// Primary provider: the ticker's listing, prices and fundamentals.
    pub fn new(http: &HttpSettings) -> Self {
        Self {
            id: YAHOO_PROVIDER_ID,
            priority: 1,
            forced_exchange: None,
            client: http.client(),
            crumb: RwLock::new(None),
        }
    }

    /// BSE fallback: prices only, always the `.BO` listing.
    pub fn bse(http: &HttpSettings) -> Self {
        Self {
            id: YAHOO_BSE_PROVIDER_ID,
            priority: 5,
            forced_exchange: Some(Exchange::Bse),
            client: http.client(),
            crumb: RwLock::new(None),
        }
    }

    fn symbol_for(&self, ticker: &Ticker) -> String {
        ticker.yahoo_symbol(self.forced_exchange.unwrap_or(ticker.exchange))
    }

    // ========================================================================
    // Crumb/Cookie Authentication
    // ========================================================================

    /// Return the cached crumb or fetch a new one.
    async fn ensure_crumb(&self) -> Result<CrumbData, MarketDataError> {
        {
            let guard = self.crumb.read().unwrap_or_else(|p| p.into_inner());
            if let Some(crumb) = guard.as_ref() {
                return Ok(crumb.clone());
            }
        }

        self.fetch_crumb().await
    }

    async fn fetch_crumb(&self) -> Result<CrumbData, MarketDataError> {
        // Step 1: cookie from fc.yahoo.com (the response status is irrelevant)
        let response = self
            .client
            .get(COOKIE_URL)
            .send()
            .await
            .map_err(|e| MarketDataError::from_reqwest(self.id, e))?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: self.id.to_string(),
                message: "Failed to parse Yahoo cookie".to_string(),
            })?;

        // Step 2: crumb for that cookie
        let crumb = http::get_text(
            self.id,
            "crumb",
            self.client.get(CRUMB_URL).header(header::COOKIE, &cookie),
        )
        .await?;

        if crumb.trim().is_empty() || crumb.contains('<') {
            return Err(MarketDataError::ProviderError {
                provider: self.id.to_string(),
                message: "Yahoo returned an invalid crumb".to_string(),
            });
        }

        let crumb_data = CrumbData {
            cookie,
            crumb: crumb.trim().to_string(),
        };
        *self.crumb.write().unwrap_or_else(|p| p.into_inner()) = Some(crumb_data.clone());
        debug!("Yahoo crumb refreshed");

        Ok(crumb_data)
    }

    /// Clear the cached crumb (used when authentication fails).
    fn clear_crumb(&self) {
        *self.crumb.write().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

/// Yahoo answers some unknown symbols with HTTP 200 and an error object.
fn body_error(body: &Value, root: &str) -> Option<String> {
    let error = body.get(root)?.get("error")?;
    if error.is_null() {
        return None;
    }
    Some(
        error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
    )
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            data_kinds: if self.forced_exchange.is_some() {
                &[DataKind::PriceSeries]
            } else {
                &[DataKind::PriceSeries, DataKind::Fundamentals]
            },
            requires_api_key: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 60,
            burst_capacity: 5,
        }
    }

    async fn get_price_series(
        &self,
        ticker: &Ticker,
        range: SeriesRange,
    ) -> Result<RawPayload, MarketDataError> {
        let symbol = self.symbol_for(ticker);
        let url = format!("{}/{}", CHART_URL, encode(&symbol));
        debug!("Yahoo chart request for {} ({})", symbol, range.period.as_str());

        let body = http::get_json(
            self.id,
            &symbol,
            self.client.get(&url).query(&[
                ("range", range.period.as_str()),
                ("interval", range.interval.as_str()),
                ("includeAdjustedClose", "true"),
            ]),
        )
        .await?;

        if let Some(code) = body_error(&body, "chart") {
            warn!("Yahoo chart error for {}: {}", symbol, code);
            return Err(if code.eq_ignore_ascii_case("Not Found") {
                MarketDataError::no_data(self.id, &symbol)
            } else {
                MarketDataError::malformed(self.id, format!("chart error: {}", code))
            });
        }

        Ok(RawPayload::json(self.id, PayloadSchema::YahooChart, body))
    }

    async fn get_fundamentals(&self, ticker: &Ticker) -> Result<RawPayload, MarketDataError> {
        if self.forced_exchange.is_some() {
            return Err(MarketDataError::NotSupported {
                operation: DataKind::Fundamentals.to_string(),
                provider: self.id.to_string(),
            });
        }

        let symbol = self.symbol_for(ticker);
        let crumb = self.ensure_crumb().await?;
        let url = format!("{}/{}", QUOTE_SUMMARY_URL, encode(&symbol));

        let response = self
            .client
            .get(&url)
            .query(&[("modules", SUMMARY_MODULES), ("crumb", crumb.crumb.as_str())])
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await
            .map_err(|e| MarketDataError::from_reqwest(self.id, e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Yahoo crumb rejected, clearing it");
            self.clear_crumb();
        }
        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error(
                self.id,
                &symbol,
                status,
                http::retry_after(&response),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MarketDataError::malformed(self.id, e.to_string()))?;

        if let Some(code) = body_error(&body, "quoteSummary") {
            return Err(if code.eq_ignore_ascii_case("Not Found") {
                MarketDataError::no_data(self.id, &symbol)
            } else {
                MarketDataError::malformed(self.id, format!("quoteSummary error: {}", code))
            });
        }

        Ok(RawPayload::json(self.id, PayloadSchema::YahooQuoteSummary, body))
    }
}
