//! Parabolic stop-and-reverse.

use tickerlens_market_data::{OhlcvBar, PriceSeries};

use super::{Reading, Trend, TrendLevel};

#[derive(Clone, Copy, Debug)]
struct PsarState {
    sar: f64,
    extreme: f64,
    af: f64,
    trend: Trend,
}

/// SAR level and trend for every bar from the second one on.
///
/// The initial trend follows the first two closes. The stop is clamped to
/// the previous two bars' lows (uptrend) or highs (downtrend), and the trend
/// reverses when price crosses it, restarting the acceleration factor.
pub fn psar_series(bars: &[OhlcvBar], af_start: f64, af_step: f64, af_max: f64) -> Vec<TrendLevel> {
    if bars.len() < 2 {
        return Vec::new();
    }

    let first = &bars[0];
    let up = bars[1].close >= first.close;
    let init = PsarState {
        sar: if up { first.low } else { first.high },
        extreme: if up { first.high } else { first.low },
        af: af_start,
        trend: if up { Trend::Up } else { Trend::Down },
    };

    let mut out = Vec::with_capacity(bars.len() - 1);
    (1..bars.len()).fold(init, |state, i| {
        let bar = &bars[i];
        let prev = &bars[i - 1];
        let prev2 = if i >= 2 { &bars[i - 2] } else { prev };
        let mut next = state;
        next.sar = state.sar + state.af * (state.extreme - state.sar);

        match state.trend {
            Trend::Up => {
                next.sar = next.sar.min(prev.low).min(prev2.low);
                if bar.low < next.sar {
                    next = PsarState {
                        sar: state.extreme,
                        extreme: bar.low,
                        af: af_start,
                        trend: Trend::Down,
                    };
                } else if bar.high > state.extreme {
                    next.extreme = bar.high;
                    next.af = (state.af + af_step).min(af_max);
                }
            }
            Trend::Down => {
                next.sar = next.sar.max(prev.high).max(prev2.high);
                if bar.high > next.sar {
                    next = PsarState {
                        sar: state.extreme,
                        extreme: bar.high,
                        af: af_start,
                        trend: Trend::Up,
                    };
                } else if bar.low < state.extreme {
                    next.extreme = bar.low;
                    next.af = (state.af + af_step).min(af_max);
                }
            }
        }

        out.push(TrendLevel {
            value: next.sar,
            trend: next.trend,
        });
        next
    });

    out
}

pub fn psar(series: &PriceSeries, af_start: f64, af_step: f64, af_max: f64) -> Reading<TrendLevel> {
    match psar_series(series.bars(), af_start, af_step, af_max).last() {
        Some(&level) => Reading::available(level),
        None => Reading::unavailable(2, series.len()),
    }
}
