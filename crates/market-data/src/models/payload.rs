use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::PriceSeries;
use super::fundamentals::FundamentalsMap;
use super::types::{DataKind, ProviderId};

/// Wire format of a provider response, used to pick the normalizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSchema {
    /// Yahoo `v8/finance/chart` JSON.
    YahooChart,
    /// Yahoo `v10/finance/quoteSummary` JSON.
    YahooQuoteSummary,
    /// Stooq daily CSV download.
    StooqCsv,
    /// Twelve Data `time_series` JSON.
    TwelveDataTimeSeries,
    /// Tiingo daily prices JSON array.
    TiingoDaily,
    /// Screener.in company page HTML.
    ScreenerHtml,
}

impl PayloadSchema {
    /// The data kind a payload of this schema carries.
    pub fn data_kind(&self) -> DataKind {
        match self {
            PayloadSchema::YahooChart
            | PayloadSchema::StooqCsv
            | PayloadSchema::TwelveDataTimeSeries
            | PayloadSchema::TiingoDaily => DataKind::PriceSeries,
            PayloadSchema::YahooQuoteSummary | PayloadSchema::ScreenerHtml => {
                DataKind::Fundamentals
            }
        }
    }
}

/// Unparsed body of a provider response.
#[derive(Clone, Debug)]
pub enum PayloadBody {
    Json(serde_json::Value),
    Text(String),
}

/// Provider-specific payload, exactly as received.
#[derive(Clone, Debug)]
pub struct RawPayload {
    pub provider: ProviderId,
    pub schema: PayloadSchema,
    pub body: PayloadBody,
    pub received_at: DateTime<Utc>,
}

impl RawPayload {
    pub fn json(provider: &'static str, schema: PayloadSchema, value: serde_json::Value) -> Self {
        Self {
            provider: ProviderId::Borrowed(provider),
            schema,
            body: PayloadBody::Json(value),
            received_at: Utc::now(),
        }
    }

    pub fn text(provider: &'static str, schema: PayloadSchema, text: String) -> Self {
        Self {
            provider: ProviderId::Borrowed(provider),
            schema,
            body: PayloadBody::Text(text),
            received_at: Utc::now(),
        }
    }
}

/// Canonical data produced by the normalizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum MarketData {
    PriceSeries(PriceSeries),
    Fundamentals(FundamentalsMap),
}

impl MarketData {
    pub fn kind(&self) -> DataKind {
        match self {
            MarketData::PriceSeries(_) => DataKind::PriceSeries,
            MarketData::Fundamentals(_) => DataKind::Fundamentals,
        }
    }
}

/// Winning result of a registry fetch.
#[derive(Clone, Debug)]
pub struct ProviderResponse {
    pub provider: ProviderId,
    pub fetched_at: DateTime<Utc>,
    pub data: MarketData,
}
