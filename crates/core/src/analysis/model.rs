use chrono::{DateTime, Utc};
use serde::Serialize;

use tickerlens_market_data::{FundamentalsMap, ProviderAttempt};

use crate::errors::Error;
use crate::indicators::IndicatorSnapshot;

/// Fundamentals of one ticker, as served by the winning provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalsSnapshot {
    pub symbol: String,
    pub data_source: String,
    pub fetched_at: DateTime<Utc>,
    pub metrics: FundamentalsMap,
}

/// Entries removed by a cache clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearedEntries {
    pub fast: usize,
    pub durable: usize,
}

/// Error as reported inside a batch result.
#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<ProviderAttempt>>,
}

impl From<&Error> for BatchError {
    fn from(err: &Error) -> Self {
        Self {
            message: err.to_string(),
            attempts: err.attempts().map(<[ProviderAttempt]>::to_vec),
        }
    }
}

/// Outcome for one ticker of a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Ok { snapshot: Box<IndicatorSnapshot> },
    Error { error: BatchError },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub ticker: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchItem {
    pub fn new(ticker: String, result: Result<IndicatorSnapshot, Error>) -> Self {
        let outcome = match result {
            Ok(snapshot) => BatchOutcome::Ok {
                snapshot: Box::new(snapshot),
            },
            Err(e) => BatchOutcome::Error {
                error: BatchError::from(&e),
            },
        };
        Self { ticker, outcome }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Ok { .. })
    }
}
