//! Body and wick classification of the latest bar.

use serde::Serialize;
use tickerlens_market_data::{OhlcvBar, PriceSeries};

use super::{round_pct, Reading};

/// Body below this share of the range is a doji.
const DOJI_BODY_RATIO: f64 = 0.05;
/// Hammer / shooting star: long wick at least this multiple of the body.
const LONG_WICK_BODY_MULTIPLE: f64 = 2.0;
/// Hammer / shooting star: short wick at most this share of the range.
const SHORT_WICK_RATIO: f64 = 0.1;
/// Hammer / shooting star: body at most this percentage of the range.
const MAX_PIN_BODY_PCT: f64 = 35.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleType {
    Bullish,
    Bearish,
    Doji,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CandleShape {
    #[serde(rename = "type")]
    pub candle_type: CandleType,
    pub body_pct: f64,
    pub upper_wick_pct: f64,
    pub lower_wick_pct: f64,
    pub is_hammer: bool,
    pub is_shooting_star: bool,
    pub is_doji: bool,
    pub is_pin_bar: bool,
}

impl CandleShape {
    fn zero_range() -> Self {
        Self {
            candle_type: CandleType::Doji,
            body_pct: 0.0,
            upper_wick_pct: 0.0,
            lower_wick_pct: 0.0,
            is_hammer: false,
            is_shooting_star: false,
            is_doji: true,
            is_pin_bar: false,
        }
    }
}

pub fn classify_bar(bar: &OhlcvBar) -> CandleShape {
    let range = bar.range();
    if range <= 0.0 {
        return CandleShape::zero_range();
    }

    let body = (bar.close - bar.open).abs();
    let upper_wick = bar.high - bar.open.max(bar.close);
    let lower_wick = bar.open.min(bar.close) - bar.low;
    let body_pct = body / range * 100.0;

    let is_doji = body < range * DOJI_BODY_RATIO;
    let candle_type = if is_doji {
        CandleType::Doji
    } else if bar.close > bar.open {
        CandleType::Bullish
    } else {
        CandleType::Bearish
    };

    let is_hammer = lower_wick >= LONG_WICK_BODY_MULTIPLE * body
        && upper_wick <= SHORT_WICK_RATIO * range
        && body_pct <= MAX_PIN_BODY_PCT;
    let is_shooting_star = upper_wick >= LONG_WICK_BODY_MULTIPLE * body
        && lower_wick <= SHORT_WICK_RATIO * range
        && body_pct <= MAX_PIN_BODY_PCT;

    CandleShape {
        candle_type,
        body_pct: round_pct(body_pct),
        upper_wick_pct: round_pct(upper_wick / range * 100.0),
        lower_wick_pct: round_pct(lower_wick / range * 100.0),
        is_hammer,
        is_shooting_star,
        is_doji,
        is_pin_bar: is_hammer || is_shooting_star,
    }
}

pub fn classify_candle(series: &PriceSeries) -> Reading<CandleShape> {
    match series.last() {
        Some(bar) => Reading::available(classify_bar(bar)),
        None => Reading::unavailable(1, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open,
            high,
            low,
            close,
            0.0,
        )
    }

    #[test]
    fn test_zero_range_is_doji() {
        let shape = classify_bar(&bar(100.0, 100.0, 100.0, 100.0));
        assert!(shape.is_doji);
        assert_eq!(shape.body_pct, 0.0);
        assert_eq!(shape.candle_type, CandleType::Doji);
        assert!(!shape.is_pin_bar);
    }

    #[test]
    fn test_hammer() {
        // Small bullish body at the top, long lower wick
        let shape = classify_bar(&bar(108.0, 110.0, 100.0, 109.5));
        assert!(shape.is_hammer);
        assert!(!shape.is_shooting_star);
        assert!(shape.is_pin_bar);
        assert_eq!(shape.body_pct, 15.0);
        assert_eq!(shape.upper_wick_pct, 5.0);
        assert_eq!(shape.lower_wick_pct, 80.0);
        assert_eq!(shape.candle_type, CandleType::Bullish);
    }

    #[test]
    fn test_shooting_star() {
        let shape = classify_bar(&bar(101.5, 110.0, 100.0, 100.5));
        assert!(shape.is_shooting_star);
        assert!(!shape.is_hammer);
        assert_eq!(shape.candle_type, CandleType::Bearish);
    }

    #[test]
    fn test_marubozu_has_no_pattern() {
        let shape = classify_bar(&bar(100.0, 110.0, 100.0, 110.0));
        assert_eq!(shape.body_pct, 100.0);
        assert!(!shape.is_doji && !shape.is_pin_bar);
    }
}
