use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tickerlens_market_data::{BarInterval, HistoryPeriod, PriceSeries};

use super::adx::{adx, AdxReading};
use super::candle::{classify_candle, CandleShape};
use super::donchian::{donchian, donchian_slope, DonchianChannel, DonchianSlope};
use super::moving_average::{last_ema, last_sma};
use super::psar::psar;
use super::rsi::rsi;
use super::supertrend::supertrend;
use super::volume::{obv, volume, ObvReading, VolumeReading};
use super::{round_value, IndicatorParams, Reading, TrendLevel};

/// Everything the engine derives from one price series.
///
/// Built fresh per request and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub data_source: String,
    /// Day of the latest bar.
    pub as_of: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub period: HistoryPeriod,
    pub interval: BarInterval,
    pub bar_count: usize,
    pub current_price: f64,
    pub sma: BTreeMap<usize, Reading<f64>>,
    pub ema: BTreeMap<usize, Reading<f64>>,
    pub rsi: Reading<f64>,
    pub rsi_sma: Reading<f64>,
    pub rsi_ema: Reading<f64>,
    pub adx: Reading<AdxReading>,
    pub psar: Reading<TrendLevel>,
    pub supertrend: Reading<TrendLevel>,
    pub donchian: Reading<DonchianChannel>,
    pub donchian_slope: Reading<DonchianSlope>,
    pub candle: Reading<CandleShape>,
    pub obv: Reading<ObvReading>,
    pub volume: Reading<VolumeReading>,
}

/// Where a series came from, carried into the snapshot.
#[derive(Clone, Debug)]
pub struct SeriesOrigin {
    pub symbol: String,
    pub data_source: String,
    pub fetched_at: DateTime<Utc>,
    pub period: HistoryPeriod,
    pub interval: BarInterval,
}

/// Runs the full indicator battery with fixed parameters.
#[derive(Clone, Debug, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Compute a snapshot. Returns `None` for an empty series.
    pub fn compute(&self, series: &PriceSeries, origin: SeriesOrigin) -> Option<IndicatorSnapshot> {
        let last = series.last()?;
        let p = &self.params;
        let closes = series.closes();

        let sma = p
            .ma_periods
            .iter()
            .map(|&n| (n, last_sma(&closes, n).map(round_value)))
            .collect();
        let ema = p
            .ma_periods
            .iter()
            .map(|&n| (n, last_ema(&closes, n).map(round_value)))
            .collect();

        let rsi = rsi(&closes, p.rsi_length, p.rsi_sma_length, p.rsi_ema_length);

        Some(IndicatorSnapshot {
            symbol: origin.symbol,
            data_source: origin.data_source,
            as_of: last.timestamp,
            fetched_at: origin.fetched_at,
            period: origin.period,
            interval: origin.interval,
            bar_count: series.len(),
            current_price: round_value(last.close),
            sma,
            ema,
            rsi: rsi.rsi.map(round_value),
            rsi_sma: rsi.rsi_sma.map(round_value),
            rsi_ema: rsi.rsi_ema.map(round_value),
            adx: adx(series, p.adx_length, p.adx_smoothing).map(|a| AdxReading {
                adx: round_value(a.adx),
                di_plus: round_value(a.di_plus),
                di_minus: round_value(a.di_minus),
            }),
            psar: psar(series, p.psar_af_start, p.psar_af_step, p.psar_af_max).map(round_level),
            supertrend: supertrend(series, p.supertrend_period, p.supertrend_multiplier)
                .map(round_level),
            donchian: donchian(series, p.donchian_length).map(|c| DonchianChannel {
                upper: round_value(c.upper),
                middle: round_value(c.middle),
                lower: round_value(c.lower),
            }),
            donchian_slope: donchian_slope(
                series,
                p.donchian_length,
                p.donchian_slope_bars,
                p.donchian_flat_pct,
            )
            .map(|s| DonchianSlope {
                slope: round_value(s.slope),
                pct: round_value(s.pct),
                direction: s.direction,
            }),
            candle: classify_candle(series),
            obv: obv(series, p.obv_sma_length),
            volume: volume(series, p.volume_sma_length),
        })
    }
}

fn round_level(level: TrendLevel) -> TrendLevel {
    TrendLevel {
        value: round_value(level.value),
        trend: level.trend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{flat_series, series_from_closes};
    use crate::indicators::SlopeDirection;

    fn origin() -> SeriesOrigin {
        SeriesOrigin {
            symbol: "TCS".to_string(),
            data_source: "YAHOO".to_string(),
            fetched_at: Utc::now(),
            period: HistoryPeriod::OneYear,
            interval: BarInterval::Daily,
        }
    }

    #[test]
    fn test_flat_series_snapshot() {
        let engine = IndicatorEngine::default();
        let snapshot = engine.compute(&flat_series(60, 100.0), origin()).unwrap();

        assert_eq!(snapshot.sma[&20], Reading::available(100.0));
        assert_eq!(snapshot.ema[&50], Reading::available(100.0));
        assert_eq!(snapshot.rsi, Reading::available(50.0));
        assert_eq!(
            snapshot.donchian_slope.value().map(|s| s.direction),
            Some(SlopeDirection::Flat)
        );
        assert!(snapshot.candle.value().unwrap().is_doji);
        assert_eq!(snapshot.bar_count, 60);
        assert_eq!(snapshot.current_price, 100.0);
    }

    #[test]
    fn test_short_series_marks_unavailable() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let engine = IndicatorEngine::default();
        let snapshot = engine.compute(&series_from_closes(&closes), origin()).unwrap();

        assert_eq!(snapshot.sma[&20], Reading::unavailable(20, 15));
        assert_eq!(snapshot.rsi, Reading::available(100.0));
        assert_eq!(snapshot.adx, Reading::unavailable(28, 15));
        assert!(snapshot.psar.is_available());
        assert!(snapshot.supertrend.is_available());
        assert_eq!(snapshot.donchian, Reading::unavailable(20, 15));

        // No nulls anywhere in the serialized form
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_empty_series() {
        let engine = IndicatorEngine::default();
        assert!(engine.compute(&PriceSeries::default(), origin()).is_none());
    }
}
