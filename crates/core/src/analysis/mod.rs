//! Ticker analysis.
//!
//! - [`model`] - Fundamentals snapshots and batch results
//! - [`service`] - Cache-first snapshot service, refresh and clear
//!
//! ```text
//! AnalysisService → TwoTierCache (fast → durable)
//!       ↓ miss
//! SingleFlight → ProviderRegistry → normalizer
//!       ↓
//! IndicatorEngine → IndicatorSnapshot
//! ```

pub mod model;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use model::{BatchError, BatchItem, BatchOutcome, ClearedEntries, FundamentalsSnapshot};
pub use service::{AnalysisService, AnalysisServiceTrait};
