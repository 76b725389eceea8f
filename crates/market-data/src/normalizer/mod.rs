//! Series normalizer.
//!
//! Turns a provider's [`RawPayload`] into canonical [`MarketData`]. Each
//! [`PayloadSchema`] has its own parser; price parsers produce loose rows
//! that all pass through the same cleaning step:
//!
//! 1. Rows without a parseable day are dropped.
//! 2. Rows with a missing or non-finite OHLC value, or `close <= 0`, are dropped.
//! 3. A missing volume becomes 0.
//! 4. Rows are sorted by day; for duplicate days the last row wins.
//!
//! A series shorter than the request's `min_bars` after cleaning is a
//! `MalformedPayload`, as is an empty fundamentals map.

mod fundamentals;
mod series;

use log::debug;

use crate::errors::MarketDataError;
use crate::models::{
    DataKind, FetchRequest, MarketData, PayloadBody, PayloadSchema, PriceSeries, RawPayload,
};

pub use series::{clean_rows, RawRow};

/// Normalize a raw provider payload for the given request.
pub fn normalize(
    payload: &RawPayload,
    request: &FetchRequest,
) -> Result<MarketData, MarketDataError> {
    let provider = payload.provider.as_ref();

    if payload.schema.data_kind() != request.data_kind {
        return Err(MarketDataError::malformed(
            provider,
            format!(
                "{:?} payload cannot answer a {} request",
                payload.schema, request.data_kind
            ),
        ));
    }

    match request.data_kind {
        DataKind::PriceSeries => {
            let rows = match (&payload.schema, &payload.body) {
                (PayloadSchema::YahooChart, PayloadBody::Json(v)) => {
                    series::parse_yahoo_chart(provider, v)?
                }
                (PayloadSchema::StooqCsv, PayloadBody::Text(t)) => {
                    series::parse_stooq_csv(provider, t)?
                }
                (PayloadSchema::TwelveDataTimeSeries, PayloadBody::Json(v)) => {
                    series::parse_twelve_data(provider, v)?
                }
                (PayloadSchema::TiingoDaily, PayloadBody::Json(v)) => {
                    series::parse_tiingo(provider, v)?
                }
                (schema, _) => {
                    return Err(MarketDataError::malformed(
                        provider,
                        format!("unexpected body for {:?}", schema),
                    ))
                }
            };

            let raw_count = rows.len();
            let series = clean_rows(rows);
            debug!(
                "Normalized {} rows from {} into {} bars",
                raw_count,
                provider,
                series.len()
            );
            check_length(provider, &series, request.min_bars)?;
            Ok(MarketData::PriceSeries(series))
        }
        DataKind::Fundamentals => {
            let map = match (&payload.schema, &payload.body) {
                (PayloadSchema::YahooQuoteSummary, PayloadBody::Json(v)) => {
                    fundamentals::parse_quote_summary(provider, v)?
                }
                (PayloadSchema::ScreenerHtml, PayloadBody::Text(t)) => {
                    fundamentals::parse_screener_html(provider, t)?
                }
                (schema, _) => {
                    return Err(MarketDataError::malformed(
                        provider,
                        format!("unexpected body for {:?}", schema),
                    ))
                }
            };

            if map.is_empty() {
                return Err(MarketDataError::malformed(provider, "no fundamentals found"));
            }
            Ok(MarketData::Fundamentals(map))
        }
    }
}

fn check_length(
    provider: &str,
    series: &PriceSeries,
    min_bars: usize,
) -> Result<(), MarketDataError> {
    let required = min_bars.max(1);
    if series.len() < required {
        return Err(MarketDataError::malformed(
            provider,
            format!(
                "only {} usable bars after cleaning, need {}",
                series.len(),
                required
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exchange, SeriesRange, Ticker};

    fn price_request(min_bars: usize) -> FetchRequest {
        FetchRequest::price_series(
            Ticker::parse("TCS", Exchange::Nse).unwrap(),
            SeriesRange::default(),
            min_bars,
        )
    }

    #[test]
    fn test_stooq_csv_cleaned_and_sorted() {
        let csv = "Date,Open,High,Low,Close,Volume\n\
                   2024-01-03,101,103,100,102,1100\n\
                   2024-01-02,100,102,99,101,1000\n\
                   2024-01-04,102,104,101,0,1200\n\
                   2024-01-05,103,105,102,104,\n";
        let payload = RawPayload::text("STOOQ", PayloadSchema::StooqCsv, csv.to_string());

        let data = normalize(&payload, &price_request(2)).unwrap();
        let MarketData::PriceSeries(series) = data else {
            panic!("expected a price series");
        };

        let days: Vec<_> = series
            .bars()
            .iter()
            .map(|b| b.timestamp.to_string())
            .collect();
        // The zero-close row is dropped, missing volume becomes 0
        assert_eq!(days, vec!["2024-01-02", "2024-01-03", "2024-01-05"]);
        assert_eq!(series.bars()[2].volume, 0.0);
    }

    #[test]
    fn test_short_series_is_malformed() {
        let csv = "Date,Open,High,Low,Close,Volume\n2024-01-02,100,102,99,101,1000\n";
        let payload = RawPayload::text("STOOQ", PayloadSchema::StooqCsv, csv.to_string());

        let err = normalize(&payload, &price_request(15)).unwrap_err();
        assert!(matches!(err, MarketDataError::MalformedPayload { .. }));
        assert!(err.to_string().contains("need 15"));
    }

    #[test]
    fn test_schema_kind_mismatch() {
        let payload = RawPayload::text("SCREENER", PayloadSchema::ScreenerHtml, String::new());
        let err = normalize(&payload, &price_request(1)).unwrap_err();
        assert!(matches!(err, MarketDataError::MalformedPayload { .. }));
    }

    #[test]
    fn test_empty_fundamentals_is_malformed() {
        let payload = RawPayload::text(
            "SCREENER",
            PayloadSchema::ScreenerHtml,
            "<html><body>Nothing here</body></html>".to_string(),
        );
        let request = FetchRequest::fundamentals(Ticker::parse("TCS", Exchange::Nse).unwrap());

        let err = normalize(&payload, &request).unwrap_err();
        assert!(matches!(err, MarketDataError::MalformedPayload { .. }));
    }
}
