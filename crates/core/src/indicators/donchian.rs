//! Donchian channel and the slope of its upper band.

use serde::Serialize;
use tickerlens_market_data::{OhlcvBar, PriceSeries};

use super::Reading;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DonchianChannel {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeDirection {
    Up,
    Flat,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DonchianSlope {
    /// Change of the upper band per bar, in price units.
    pub slope: f64,
    /// `slope` as a percentage of the earlier upper band.
    pub pct: f64,
    pub direction: SlopeDirection,
}

/// Channel over the last `length` bars of `bars`.
fn channel_at_end(bars: &[OhlcvBar], length: usize) -> Option<DonchianChannel> {
    if length == 0 || bars.len() < length {
        return None;
    }
    let window = &bars[bars.len() - length..];
    let upper = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let lower = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    Some(DonchianChannel {
        upper,
        middle: (upper + lower) / 2.0,
        lower,
    })
}

pub fn donchian(series: &PriceSeries, length: usize) -> Reading<DonchianChannel> {
    match channel_at_end(series.bars(), length) {
        Some(channel) => Reading::available(channel),
        None => Reading::unavailable(length, series.len()),
    }
}

/// Compare today's upper band with the band `slope_bars` bars earlier.
///
/// A per-bar change smaller than `flat_pct` percent in either direction is
/// reported as flat.
pub fn donchian_slope(
    series: &PriceSeries,
    length: usize,
    slope_bars: usize,
    flat_pct: f64,
) -> Reading<DonchianSlope> {
    let bars = series.bars();
    let required = length + slope_bars;
    if slope_bars == 0 || bars.len() < required {
        return Reading::unavailable(required, bars.len());
    }

    let (Some(now), Some(before)) = (
        channel_at_end(bars, length),
        channel_at_end(&bars[..bars.len() - slope_bars], length),
    ) else {
        return Reading::unavailable(required, bars.len());
    };

    let slope = (now.upper - before.upper) / slope_bars as f64;
    let pct = if before.upper == 0.0 {
        0.0
    } else {
        slope / before.upper * 100.0
    };
    let direction = if pct.abs() < flat_pct {
        SlopeDirection::Flat
    } else if pct > 0.0 {
        SlopeDirection::Up
    } else {
        SlopeDirection::Down
    };

    Reading::available(DonchianSlope {
        slope,
        pct,
        direction,
    })
}
