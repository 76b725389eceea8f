//! Core error types for Tickerlens.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use std::time::Duration;

use thiserror::Error;

use tickerlens_market_data::errors::MarketDataError;
use tickerlens_market_data::ProviderAttempt;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
///
/// Only `InvalidTicker`, `TickerNotFound`, `AllProvidersExhausted` and
/// `FetchTimeout` are meant to reach an end user; the rest are internal.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Timed out after {waited:?} waiting for {key}")]
    FetchTimeout { key: String, waited: Duration },

    #[error("Durable cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// The per-provider attempts when every provider failed.
    pub fn attempts(&self) -> Option<&[ProviderAttempt]> {
        match self {
            Error::MarketData(MarketDataError::AllProvidersExhausted { attempts, .. }) => {
                Some(attempts)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::MarketData(MarketDataError::TickerNotFound(_)))
    }

    pub fn is_invalid_ticker(&self) -> bool {
        matches!(
            self,
            Error::InvalidTicker(_) | Error::MarketData(MarketDataError::InvalidTicker(_))
        )
    }
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug, Clone)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unexpected(format!("serialization: {}", err))
    }
}
