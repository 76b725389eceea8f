// Average Directional Index.
//
//   1. +DM, -DM and true range per bar-to-bar transition.
//   2. Wilder-smooth each over `length`.
//   3. +DI = 100 * sm(+DM) / sm(TR), -DI likewise.
//   4. DX  = 100 * |+DI - -DI| / (+DI + -DI).
//   5. ADX = Wilder-smoothed DX over `smoothing`.

use serde::Serialize;
use tickerlens_market_data::PriceSeries;

use super::moving_average::rma;
use super::Reading;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdxReading {
    pub adx: f64,
    pub di_plus: f64,
    pub di_minus: f64,
}

fn directional_index(dm: f64, tr: f64) -> f64 {
    if tr == 0.0 {
        0.0
    } else {
        100.0 * dm / tr
    }
}

pub fn adx(series: &PriceSeries, length: usize, smoothing: usize) -> Reading<AdxReading> {
    let bars = series.bars();
    let required = length + smoothing;
    if length == 0 || smoothing == 0 || bars.len() < required {
        return Reading::unavailable(required, bars.len());
    }

    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);
    let mut tr = Vec::with_capacity(bars.len() - 1);
    for w in bars.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);
        let up = cur.high - prev.high;
        let down = prev.low - cur.low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
        tr.push(cur.true_range(prev.close));
    }

    let atr = rma(&tr, length);
    let di: Vec<(f64, f64)> = rma(&plus_dm, length)
        .into_iter()
        .zip(rma(&minus_dm, length))
        .zip(&atr)
        .map(|((p, m), &t)| (directional_index(p, t), directional_index(m, t)))
        .collect();

    let dx: Vec<f64> = di
        .iter()
        .map(|&(p, m)| {
            let sum = p + m;
            if sum == 0.0 {
                0.0
            } else {
                100.0 * (p - m).abs() / sum
            }
        })
        .collect();

    match (rma(&dx, smoothing).last(), di.last()) {
        (Some(&adx), Some(&(di_plus, di_minus))) => Reading::available(AdxReading {
            adx,
            di_plus,
            di_minus,
        }),
        _ => Reading::unavailable(required, bars.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{flat_series, series_from_closes};

    #[test]
    fn test_steady_uptrend_is_strong() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + 2.0 * i as f64).collect();
        let reading = adx(&series_from_closes(&closes), 14, 14);
        let value = reading.value().unwrap();
        assert!(value.adx > 25.0, "adx was {}", value.adx);
        assert!(value.di_plus > value.di_minus);
        assert_eq!(value.di_minus, 0.0);
    }

    #[test]
    fn test_exact_minimum_length() {
        let closes: Vec<f64> = (0..28).map(|i| 100.0 + i as f64).collect();
        assert!(adx(&series_from_closes(&closes), 14, 14).is_available());
        assert_eq!(
            adx(&series_from_closes(&closes[..27]), 14, 14),
            Reading::unavailable(28, 27)
        );
    }

    #[test]
    fn test_flat_series_has_no_direction() {
        let reading = adx(&flat_series(30, 100.0), 14, 14);
        let value = reading.value().unwrap();
        assert_eq!(value.adx, 0.0);
        assert_eq!(value.di_plus, 0.0);
    }
}
