//! Technical indicator engine.
//!
//! Every indicator is a pure function of a [`PriceSeries`]. Recursive
//! indicators (EMA, Wilder smoothing, PSAR, SuperTrend) are written as
//! explicit folds over the bars so each can be exercised on a synthetic
//! sequence.
//!
//! Values are wrapped in a [`Reading`]: a series shorter than an
//! indicator's minimum length yields `Unavailable` with the bar counts,
//! never a bare null.

mod adx;
mod candle;
mod donchian;
mod moving_average;
mod psar;
mod rsi;
mod snapshot;
mod supertrend;
mod volume;

use serde::{Deserialize, Serialize};

pub use adx::{adx, AdxReading};
pub use candle::{classify_candle, CandleShape, CandleType};
pub use donchian::{donchian, donchian_slope, DonchianChannel, DonchianSlope, SlopeDirection};
pub use moving_average::{ema, last_ema, last_sma, rma, sma};
pub use psar::{psar, psar_series};
pub use rsi::{rsi, rsi_series, RsiReadings};
pub use snapshot::{IndicatorEngine, IndicatorSnapshot, SeriesOrigin};
pub use supertrend::{supertrend, supertrend_series};
pub use volume::{obv, volume, ObvReading, ObvTrend, VolumeReading, VolumeTrend};

use crate::constants::{PERCENT_PRECISION, VALUE_PRECISION};

/// Result of one indicator on one series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reading<T> {
    Available { value: T },
    /// The series was too short.
    Unavailable { required: usize, available: usize },
}

impl<T> Reading<T> {
    pub fn available(value: T) -> Self {
        Reading::Available { value }
    }

    pub fn unavailable(required: usize, available: usize) -> Self {
        Reading::Unavailable {
            required,
            available,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Reading::Available { value } => Some(value),
            Reading::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Available { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Available { value } => Reading::Available { value: f(value) },
            Reading::Unavailable {
                required,
                available,
            } => Reading::Unavailable {
                required,
                available,
            },
        }
    }
}

/// Direction of a stop-and-reverse style indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
}

/// A level together with the trend it belongs to (PSAR, SuperTrend).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendLevel {
    pub value: f64,
    pub trend: Trend,
}

/// Lengths and factors for the whole battery.
#[derive(Clone, Debug, PartialEq)]
pub struct IndicatorParams {
    /// Windows for both SMA and EMA.
    pub ma_periods: Vec<usize>,
    pub rsi_length: usize,
    pub rsi_sma_length: usize,
    pub rsi_ema_length: usize,
    pub adx_length: usize,
    pub adx_smoothing: usize,
    pub psar_af_start: f64,
    pub psar_af_step: f64,
    pub psar_af_max: f64,
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
    pub donchian_length: usize,
    pub donchian_slope_bars: usize,
    /// Per-bar slope (in percent) below which the channel counts as flat.
    pub donchian_flat_pct: f64,
    pub obv_sma_length: usize,
    pub volume_sma_length: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_periods: vec![20, 30, 50],
            rsi_length: 14,
            rsi_sma_length: 14,
            rsi_ema_length: 14,
            adx_length: 14,
            adx_smoothing: 14,
            psar_af_start: 0.002,
            psar_af_step: 0.002,
            psar_af_max: 0.5,
            supertrend_period: 7,
            supertrend_multiplier: 3.0,
            donchian_length: 20,
            donchian_slope_bars: 5,
            donchian_flat_pct: 0.05,
            obv_sma_length: 20,
            volume_sma_length: 20,
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Round an indicator value for output.
pub(crate) fn round_value(value: f64) -> f64 {
    round_to(value, VALUE_PRECISION)
}

/// Round a percentage for output.
pub(crate) fn round_pct(value: f64) -> f64 {
    round_to(value, PERCENT_PRECISION)
}
