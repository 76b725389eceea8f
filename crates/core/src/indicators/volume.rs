//! On-balance volume and volume-versus-average.

use serde::Serialize;
use tickerlens_market_data::PriceSeries;

use super::moving_average::last_sma;
use super::{round_value, Reading};

const ABOVE_AVERAGE_RATIO: f64 = 1.5;
const AVERAGE_RATIO: f64 = 0.75;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObvTrend {
    Bullish,
    Bearish,
    /// The OBV average is not available yet.
    Neutral,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObvReading {
    pub obv: f64,
    pub sma: Reading<f64>,
    pub trend: ObvTrend,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    AboveAverage,
    Average,
    BelowAverage,
    InsufficientData,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VolumeReading {
    pub latest: f64,
    pub sma: Reading<f64>,
    /// Latest volume over its average; absent when the average is zero or
    /// not available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    pub trend: VolumeTrend,
}

/// Cumulative volume signed by the close-to-close direction, starting at 0.
fn obv_series(series: &PriceSeries) -> Vec<f64> {
    let bars = series.bars();
    let mut out = Vec::with_capacity(bars.len());
    let mut total = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev = bars[i - 1].close;
            if bar.close > prev {
                total += bar.volume;
            } else if bar.close < prev {
                total -= bar.volume;
            }
        }
        out.push(total);
    }
    out
}

pub fn obv(series: &PriceSeries, sma_length: usize) -> Reading<ObvReading> {
    if series.len() < 2 {
        return Reading::unavailable(2, series.len());
    }
    let values = obv_series(series);
    let obv = values[values.len() - 1];
    let sma = last_sma(&values, sma_length).map(round_value);
    let trend = match sma.value() {
        Some(&avg) if obv > avg => ObvTrend::Bullish,
        Some(_) => ObvTrend::Bearish,
        None => ObvTrend::Neutral,
    };
    Reading::available(ObvReading {
        obv: round_value(obv),
        sma,
        trend,
    })
}

pub fn volume(series: &PriceSeries, sma_length: usize) -> Reading<VolumeReading> {
    let Some(last) = series.last() else {
        return Reading::unavailable(1, 0);
    };
    let latest = last.volume;
    let sma = last_sma(&series.volumes(), sma_length);

    let ratio = match sma.value() {
        Some(&avg) if avg > 0.0 => Some(latest / avg),
        _ => None,
    };
    let trend = match ratio {
        Some(r) if r >= ABOVE_AVERAGE_RATIO => VolumeTrend::AboveAverage,
        Some(r) if r >= AVERAGE_RATIO => VolumeTrend::Average,
        Some(_) => VolumeTrend::BelowAverage,
        None => VolumeTrend::InsufficientData,
    };

    Reading::available(VolumeReading {
        latest: round_value(latest),
        sma: sma.map(round_value),
        ratio: ratio.map(round_value),
        trend,
    })
}
