//! SuperTrend: ATR bands around the bar midpoint that ratchet with the trend.

use tickerlens_market_data::{OhlcvBar, PriceSeries};

use super::moving_average::rma;
use super::{Reading, Trend, TrendLevel};

#[derive(Clone, Copy, Debug)]
struct Bands {
    upper: f64,
    lower: f64,
    trend: Trend,
}

/// SuperTrend level for every bar that has a full ATR, oldest first.
///
/// ATR is Wilder-smoothed true range over `period` transitions, so the
/// first level belongs to `bars[period]`. The upper band only moves down and
/// the lower band only moves up unless the previous close broke through
/// them. The trend flips when the close crosses the active band.
pub fn supertrend_series(bars: &[OhlcvBar], period: usize, multiplier: f64) -> Vec<TrendLevel> {
    if period == 0 || bars.len() < period + 1 {
        return Vec::new();
    }

    let tr: Vec<f64> = bars
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();
    let atr = rma(&tr, period);

    let mut out = Vec::with_capacity(atr.len());
    let mut prev: Option<Bands> = None;

    for (offset, &atr) in atr.iter().enumerate() {
        let i = period + offset;
        let bar = &bars[i];
        let mid = bar.median_price();
        let basic_upper = mid + multiplier * atr;
        let basic_lower = mid - multiplier * atr;

        let bands = match prev {
            None => Bands {
                upper: basic_upper,
                lower: basic_lower,
                trend: if bar.close >= basic_lower {
                    Trend::Up
                } else {
                    Trend::Down
                },
            },
            Some(p) => {
                let prev_close = bars[i - 1].close;
                let upper = if basic_upper < p.upper || prev_close > p.upper {
                    basic_upper
                } else {
                    p.upper
                };
                let lower = if basic_lower > p.lower || prev_close < p.lower {
                    basic_lower
                } else {
                    p.lower
                };
                let trend = match p.trend {
                    Trend::Down if bar.close > upper => Trend::Up,
                    Trend::Up if bar.close < lower => Trend::Down,
                    same => same,
                };
                Bands {
                    upper,
                    lower,
                    trend,
                }
            }
        };

        out.push(TrendLevel {
            value: match bands.trend {
                Trend::Up => bands.lower,
                Trend::Down => bands.upper,
            },
            trend: bands.trend,
        });
        prev = Some(bands);
    }

    out
}

pub fn supertrend(series: &PriceSeries, period: usize, multiplier: f64) -> Reading<TrendLevel> {
    match supertrend_series(series.bars(), period, multiplier).last() {
        Some(&level) => Reading::available(level),
        None => Reading::unavailable(period + 1, series.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::series_from_closes;

    #[test]
    fn test_uptrend_uses_lower_band() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = series_from_closes(&closes);
        let level = *supertrend(&series, 7, 3.0).value().unwrap();
        assert_eq!(level.trend, Trend::Up);
        assert!(level.value < series.last().unwrap().close);
    }

    #[test]
    fn test_crash_flips_down() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.extend((1..=10).map(|i| 119.0 - 8.0 * i as f64));
        let series = series_from_closes(&closes);

        let levels = supertrend_series(series.bars(), 7, 3.0);
        let last = levels.last().unwrap();
        assert_eq!(last.trend, Trend::Down);
        assert!(last.value > series.last().unwrap().close);
    }

    #[test]
    fn test_minimum_length() {
        let closes: Vec<f64> = (0..8).map(|i| 100.0 + i as f64).collect();
        assert_eq!(supertrend_series(series_from_closes(&closes).bars(), 7, 3.0).len(), 1);
        assert_eq!(
            supertrend(&series_from_closes(&closes[..7]), 7, 3.0),
            Reading::unavailable(8, 7)
        );
    }
}
