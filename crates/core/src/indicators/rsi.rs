// Relative Strength Index with Wilder's smoothing.
//
// Average gain and loss are seeded with the SMA of the first `length`
// deltas, then smoothed as `(prev * (length - 1) + x) / length`.
// RSI = 100 - 100 / (1 + avg_gain / avg_loss).

use serde::Serialize;

use super::moving_average::{ema, rma, sma};
use super::Reading;

/// RSI plus its SMA and EMA, each over the RSI series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RsiReadings {
    pub rsi: Reading<f64>,
    pub rsi_sma: Reading<f64>,
    pub rsi_ema: Reading<f64>,
}

/// Full RSI series. The first value lines up with `closes[length]`.
pub fn rsi_series(closes: &[f64], length: usize) -> Vec<f64> {
    if length == 0 || closes.len() < length + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = deltas.iter().map(|d| d.max(0.0)).collect();
    let losses: Vec<f64> = deltas.iter().map(|d| (-d).max(0.0)).collect();

    rma(&gains, length)
        .into_iter()
        .zip(rma(&losses, length))
        .map(|(g, l)| rsi_from_averages(g, l))
        .collect()
}

/// No movement at all reads as neutral; no losses saturates at 100.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

pub fn rsi(closes: &[f64], length: usize, sma_length: usize, ema_length: usize) -> RsiReadings {
    let series = rsi_series(closes, length);
    let n = closes.len();

    let rsi = match series.last() {
        Some(&v) => Reading::available(v),
        None => Reading::unavailable(length + 1, n),
    };
    let rsi_sma = match sma(&series, sma_length).last() {
        Some(&v) => Reading::available(v),
        None => Reading::unavailable(length + sma_length, n),
    };
    let rsi_ema = match ema(&series, ema_length).last() {
        Some(&v) => Reading::available(v),
        None => Reading::unavailable(length + ema_length, n),
    };

    RsiReadings {
        rsi,
        rsi_sma,
        rsi_ema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_series_saturates() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&closes, 14, 14, 14);
        assert_eq!(out.rsi, Reading::available(100.0));
        assert_eq!(out.rsi_sma, Reading::available(100.0));
    }

    #[test]
    fn test_flat_series_is_neutral() {
        let closes = vec![100.0; 20];
        assert_eq!(rsi(&closes, 14, 14, 14).rsi, Reading::available(50.0));
    }

    #[test]
    fn test_falling_series_is_zero() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&closes, 14, 14, 14).rsi, Reading::available(0.0));
    }

    #[test]
    fn test_minimum_lengths() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + (i % 3) as f64).collect();
        let out = rsi(&closes, 14, 14, 14);
        assert!(out.rsi.is_available());
        assert_eq!(out.rsi_sma, Reading::unavailable(28, 15));

        let out = rsi(&closes[..14], 14, 14, 14);
        assert_eq!(out.rsi, Reading::unavailable(15, 14));
    }

    #[test]
    fn test_known_value() {
        // Two gains of 2 and one loss of 1 with length 3: RS = (4/3) / (1/3) = 4
        let closes = [10.0, 12.0, 11.0, 13.0];
        let series = rsi_series(&closes, 3);
        assert_eq!(series.len(), 1);
        assert!((series[0] - 80.0).abs() < 1e-9);
    }
}
