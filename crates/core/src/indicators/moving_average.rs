//! Simple, exponential and Wilder moving averages.

use super::Reading;

/// Simple moving average over every full window.
///
/// The first value lines up with `values[period - 1]`.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Seeded recursion shared by EMA and Wilder's RMA:
/// `next = prev + alpha * (x - prev)`, starting from the SMA of the first
/// `period` values.
fn smoothed(values: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    values[period..]
        .iter()
        .fold(vec![seed], |mut acc, &x| {
            let prev = acc[acc.len() - 1];
            acc.push(prev + alpha * (x - prev));
            acc
        })
}

/// Exponential moving average, `alpha = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    smoothed(values, period, 2.0 / (period as f64 + 1.0))
}

/// Wilder's running moving average, `alpha = 1 / period`.
pub fn rma(values: &[f64], period: usize) -> Vec<f64> {
    smoothed(values, period, 1.0 / period.max(1) as f64)
}

pub fn last_sma(values: &[f64], period: usize) -> Reading<f64> {
    match sma(values, period).last() {
        Some(&v) => Reading::available(v),
        None => Reading::unavailable(period, values.len()),
    }
}

pub fn last_ema(values: &[f64], period: usize) -> Reading<f64> {
    match ema(values, period).last() {
        Some(&v) => Reading::available(v),
        None => Reading::unavailable(period, values.len()),
    }
}
