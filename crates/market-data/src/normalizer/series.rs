//! Price-series parsers, one per provider schema, plus the shared cleaner.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::{OhlcvBar, PriceSeries};

/// A provider row before cleaning. Any field may be missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow {
    pub day: Option<NaiveDate>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl RawRow {
    fn into_bar(self) -> Option<OhlcvBar> {
        let day = self.day?;
        let ohlc = [self.open?, self.high?, self.low?, self.close?];
        if ohlc.iter().any(|v| !v.is_finite()) || ohlc[3] <= 0.0 {
            return None;
        }
        let volume = self.volume.filter(|v| v.is_finite()).unwrap_or(0.0);
        Some(OhlcvBar::new(day, ohlc[0], ohlc[1], ohlc[2], ohlc[3], volume))
    }
}

/// Drop unusable rows, sort by day and keep the last row of each day.
pub fn clean_rows(rows: Vec<RawRow>) -> PriceSeries {
    let mut bars: Vec<OhlcvBar> = rows.into_iter().filter_map(RawRow::into_bar).collect();
    // Stable, so rows sharing a day keep their input order
    bars.sort_by_key(|b| b.timestamp);

    let mut deduped: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
            _ => deduped.push(bar),
        }
    }

    // Sorted and de-duplicated above, so the invariant holds
    PriceSeries::from_sorted(deduped).unwrap_or_default()
}

/// Leading `YYYY-MM-DD` of a date or datetime string.
fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// A JSON number or a numeric string.
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// ============================================================================
// Yahoo chart
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<Option<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Vec<ChartAdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

/// Parallel arrays from `v8/finance/chart`.
///
/// Prices are adjusted by `adjclose / close` when adjusted closes are
/// present. Timestamps are shifted by the exchange's GMT offset before the
/// day is taken.
pub(super) fn parse_yahoo_chart(provider: &str, body: &Value) -> Result<Vec<RawRow>, MarketDataError> {
    let envelope = ChartEnvelope::deserialize(body)
        .map_err(|e| MarketDataError::malformed(provider, format!("chart: {}", e)))?;

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| MarketDataError::malformed(provider, "chart has no result"))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .unwrap_or_default()
        .adjclose;
    let offset = result.meta.gmtoffset;

    let rows = result
        .timestamp
        .iter()
        .enumerate()
        .map(|(i, ts)| {
            let day = ts
                .and_then(|t| t.checked_add(offset))
                .and_then(|t| DateTime::from_timestamp(t, 0))
                .map(|dt| dt.date_naive());
            let close = at(&quote.close, i);
            let factor = match (at(&adjclose, i), close) {
                (Some(adj), Some(c)) if c > 0.0 && adj.is_finite() => adj / c,
                _ => 1.0,
            };
            RawRow {
                day,
                open: at(&quote.open, i).map(|v| v * factor),
                high: at(&quote.high, i).map(|v| v * factor),
                low: at(&quote.low, i).map(|v| v * factor),
                close: close.map(|v| v * factor),
                volume: at(&quote.volume, i),
            }
        })
        .collect();

    Ok(rows)
}

// ============================================================================
// Stooq CSV
// ============================================================================

/// `Date,Open,High,Low,Close,Volume` with a header row; column names are
/// matched case-insensitively.
pub(super) fn parse_stooq_csv(provider: &str, text: &str) -> Result<Vec<RawRow>, MarketDataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| MarketDataError::malformed(provider, format!("csv header: {}", e)))?;
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_ascii_lowercase(), i))
        .collect();

    for required in ["date", "open", "high", "low", "close"] {
        if !columns.contains_key(required) {
            return Err(MarketDataError::malformed(
                provider,
                format!("csv is missing the '{}' column", required),
            ));
        }
    }

    let field = |record: &csv::StringRecord, name: &str| -> Option<f64> {
        columns
            .get(name)
            .and_then(|&i| record.get(i))
            .and_then(|v| v.parse::<f64>().ok())
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| MarketDataError::malformed(provider, format!("csv row: {}", e)))?;
        rows.push(RawRow {
            day: columns
                .get("date")
                .and_then(|&i| record.get(i))
                .and_then(parse_day),
            open: field(&record, "open"),
            high: field(&record, "high"),
            low: field(&record, "low"),
            close: field(&record, "close"),
            volume: field(&record, "volume"),
        });
    }

    Ok(rows)
}

// ============================================================================
// Twelve Data
// ============================================================================

/// `{"values": [{"datetime": "...", "open": "..."}], "status": "ok"}`.
/// Numbers arrive as strings.
pub(super) fn parse_twelve_data(provider: &str, body: &Value) -> Result<Vec<RawRow>, MarketDataError> {
    if body.get("status").and_then(Value::as_str) == Some("error") {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("status error");
        return Err(MarketDataError::malformed(provider, message));
    }

    let values = body
        .get("values")
        .and_then(Value::as_array)
        .ok_or_else(|| MarketDataError::malformed(provider, "time_series has no values"))?;

    Ok(values
        .iter()
        .map(|v| RawRow {
            day: v.get("datetime").and_then(Value::as_str).and_then(parse_day),
            open: number(v.get("open")),
            high: number(v.get("high")),
            low: number(v.get("low")),
            close: number(v.get("close")),
            volume: number(v.get("volume")),
        })
        .collect())
}

// ============================================================================
// Tiingo
// ============================================================================

/// Array of daily rows. Split/dividend-adjusted fields are preferred.
pub(super) fn parse_tiingo(provider: &str, body: &Value) -> Result<Vec<RawRow>, MarketDataError> {
    let rows = body
        .as_array()
        .ok_or_else(|| MarketDataError::malformed(provider, "expected an array of prices"))?;

    let pick = |row: &Value, adjusted: &str, raw: &str| {
        number(row.get(adjusted)).or_else(|| number(row.get(raw)))
    };

    Ok(rows
        .iter()
        .map(|row| RawRow {
            day: row.get("date").and_then(Value::as_str).and_then(parse_day),
            open: pick(row, "adjOpen", "open"),
            high: pick(row, "adjHigh", "high"),
            low: pick(row, "adjLow", "low"),
            close: pick(row, "adjClose", "close"),
            volume: pick(row, "adjVolume", "volume"),
        })
        .collect())
}
