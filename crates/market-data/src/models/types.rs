use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// The kind of data a query asks for.
///
/// Providers advertise the kinds they can serve; the registry only
/// routes a request to providers whose capabilities include its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    PriceSeries,
    Fundamentals,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::PriceSeries => "price_series",
            DataKind::Fundamentals => "fundamentals",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_series" => Ok(DataKind::PriceSeries),
            "fundamentals" => Ok(DataKind::Fundamentals),
            other => Err(MarketDataError::InvalidTicker(format!(
                "unknown data kind '{}'",
                other
            ))),
        }
    }
}

/// Indian listing venue of a ticker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    #[default]
    Nse,
    Bse,
}

impl Exchange {
    /// Yahoo-style listing suffix.
    pub fn yahoo_suffix(&self) -> &'static str {
        match self {
            Exchange::Nse => ".NS",
            Exchange::Bse => ".BO",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Nse => "NSE",
            Exchange::Bse => "BSE",
        }
    }
}

impl FromStr for Exchange {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NSE" => Ok(Exchange::Nse),
            "BSE" => Ok(Exchange::Bse),
            other => Err(MarketDataError::InvalidTicker(format!(
                "unknown exchange '{}'",
                other
            ))),
        }
    }
}

/// A normalized ticker: upper-cased base symbol plus the listing to prefer.
///
/// Accepts `RELIANCE`, `reliance.ns`, `RELIANCE.BO` or `RELIANCE.BSE`.
/// A bare symbol takes the caller's default exchange.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub exchange: Exchange,
}

impl Ticker {
    pub fn parse(raw: &str, default_exchange: Exchange) -> Result<Self, MarketDataError> {
        let upper = raw.trim().to_ascii_uppercase();

        let (base, exchange) = if let Some(base) = upper.strip_suffix(".NS") {
            (base, Exchange::Nse)
        } else if let Some(base) = upper
            .strip_suffix(".BO")
            .or_else(|| upper.strip_suffix(".BSE"))
        {
            (base, Exchange::Bse)
        } else {
            (upper.as_str(), default_exchange)
        };

        let valid = !base.is_empty()
            && base.len() <= 32
            && base
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '&' | '_'));
        if !valid {
            return Err(MarketDataError::InvalidTicker(raw.to_string()));
        }

        Ok(Self {
            symbol: base.to_string(),
            exchange,
        })
    }

    /// Symbol with the Yahoo suffix for the given listing.
    pub fn yahoo_symbol(&self, exchange: Exchange) -> String {
        format!("{}{}", self.symbol, exchange.yahoo_suffix())
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// How far back a price series reaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl HistoryPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::OneMonth => "1mo",
            HistoryPeriod::ThreeMonths => "3mo",
            HistoryPeriod::SixMonths => "6mo",
            HistoryPeriod::OneYear => "1y",
            HistoryPeriod::TwoYears => "2y",
            HistoryPeriod::FiveYears => "5y",
            HistoryPeriod::TenYears => "10y",
        }
    }

    /// Calendar days covered.
    pub fn days(&self) -> i64 {
        match self {
            HistoryPeriod::OneMonth => 30,
            HistoryPeriod::ThreeMonths => 90,
            HistoryPeriod::SixMonths => 180,
            HistoryPeriod::OneYear => 365,
            HistoryPeriod::TwoYears => 730,
            HistoryPeriod::FiveYears => 1825,
            HistoryPeriod::TenYears => 3650,
        }
    }

    /// Approximate number of trading sessions, for APIs that take a bar count.
    pub fn trading_bars(&self) -> u32 {
        match self {
            HistoryPeriod::OneMonth => 30,
            HistoryPeriod::ThreeMonths => 90,
            HistoryPeriod::SixMonths => 130,
            HistoryPeriod::OneYear => 252,
            HistoryPeriod::TwoYears => 504,
            HistoryPeriod::FiveYears => 1260,
            HistoryPeriod::TenYears => 2520,
        }
    }
}

impl FromStr for HistoryPeriod {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1mo" => Ok(HistoryPeriod::OneMonth),
            "3mo" => Ok(HistoryPeriod::ThreeMonths),
            "6mo" => Ok(HistoryPeriod::SixMonths),
            "1y" => Ok(HistoryPeriod::OneYear),
            "2y" => Ok(HistoryPeriod::TwoYears),
            "5y" => Ok(HistoryPeriod::FiveYears),
            "10y" => Ok(HistoryPeriod::TenYears),
            other => Err(MarketDataError::InvalidTicker(format!(
                "unsupported history period '{}'",
                other
            ))),
        }
    }
}

/// Bar spacing. Intraday bars are not served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarInterval {
    #[default]
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl BarInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarInterval::Daily => "1d",
            BarInterval::Weekly => "1wk",
            BarInterval::Monthly => "1mo",
        }
    }
}

impl FromStr for BarInterval {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(BarInterval::Daily),
            "1wk" => Ok(BarInterval::Weekly),
            "1mo" => Ok(BarInterval::Monthly),
            other => Err(MarketDataError::InvalidTicker(format!(
                "unsupported bar interval '{}'",
                other
            ))),
        }
    }
}

/// Range of a price-series request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesRange {
    pub period: HistoryPeriod,
    pub interval: BarInterval,
}

/// A single upstream query routed through the registry.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub ticker: Ticker,
    pub data_kind: DataKind,
    pub range: SeriesRange,
    /// Fewest cleaned bars a price series may have before it is rejected.
    pub min_bars: usize,
}

impl FetchRequest {
    pub fn price_series(ticker: Ticker, range: SeriesRange, min_bars: usize) -> Self {
        Self {
            ticker,
            data_kind: DataKind::PriceSeries,
            range,
            min_bars,
        }
    }

    pub fn fundamentals(ticker: Ticker) -> Self {
        Self {
            ticker,
            data_kind: DataKind::Fundamentals,
            range: SeriesRange::default(),
            min_bars: 0,
        }
    }
}
