use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One OHLCV bar, keyed by its trading day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    pub fn new(timestamp: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Full high-low span.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Largest of the bar's own range and the gaps from the previous close.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        self.range()
            .max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }

    /// Midpoint of high and low.
    pub fn median_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Bars ordered strictly by ascending timestamp with no duplicates.
///
/// Only the normalizer builds series from provider data, so every
/// `PriceSeries` seen by the indicator engine already holds the ordering
/// invariant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries {
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    /// Wrap bars that are already sorted and de-duplicated.
    ///
    /// Returns `None` when the ordering invariant does not hold.
    pub fn from_sorted(bars: Vec<OhlcvBar>) -> Option<Self> {
        let ordered = bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp);
        ordered.then_some(Self { bars })
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}
