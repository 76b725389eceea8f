//! Tickerlens Core - caching, indicators and the analysis service.
//!
//! This crate sits between the `market-data` crate (providers, fallback
//! chain, normalization) and whatever serves callers. It owns the two-tier
//! cache contract, single-flight fetch deduplication and the indicator
//! engine. The durable cache tier is implemented by the `storage-sqlite`
//! crate.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod indicators;
pub mod single_flight;

pub use analysis::{AnalysisService, AnalysisServiceTrait};
pub use config::EngineConfig;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
