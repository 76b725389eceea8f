//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use std::time::Duration;

use thiserror::Error;

use crate::registry::{summarize_attempts, ProviderAttempt};

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines how the provider registry should handle the error.
///
/// The type is `Clone` so one fetch result can be handed to every caller
/// waiting on the same in-flight request.
#[derive(Error, Debug, Clone)]
pub enum MarketDataError {
    /// The ticker does not exist upstream.
    /// This is ticker-specific, so no other provider is asked.
    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    /// This provider has nothing for the ticker (no coverage for the listing,
    /// an empty answer or a 404). Other providers may still have it.
    #[error("No data from {provider} for {symbol}")]
    NoData {
        /// The provider without coverage
        provider: String,
        /// The ticker requested
        symbol: String,
    },

    /// The caller passed something that cannot be a ticker or query.
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    /// The provider signalled a quota (HTTP 429 or an equivalent API note).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
        /// Cool-down the provider asked for, when it said so
        retry_after: Option<Duration>,
    },

    /// The local token bucket could not hand out a permit within the wait ceiling.
    #[error("Rate limit exceeded: {provider} (no permit within {waited:?})")]
    RateLimitExceeded {
        /// The provider whose budget is exhausted
        provider: String,
        /// How long the caller was willing to wait
        waited: Duration,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// Transport or server-side failure (connection reset, 5xx).
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider rejected our credentials.
    #[error("Unauthorized: {provider}")]
    Unauthorized {
        /// The provider that refused the request
        provider: String,
    },

    /// The payload could not be normalized into the canonical schema.
    #[error("Malformed payload from {provider}: {message}")]
    MalformedPayload {
        /// The provider that produced the payload
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// The provider does not implement the requested operation.
    #[error("Operation '{operation}' not supported by {provider}")]
    NotSupported {
        /// The operation attempted
        operation: String,
        /// The provider asked
        provider: String,
    },

    /// Every capable provider was tried and none succeeded.
    #[error("All providers exhausted for {symbol}: {}", summarize_attempts(.attempts))]
    AllProvidersExhausted {
        /// The ticker requested
        symbol: String,
        /// One entry per provider considered, in the order tried
        attempts: Vec<ProviderAttempt>,
    },
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerlens_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Timeout { provider: "YAHOO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Transient);
    ///
    /// let error = MarketDataError::TickerNotFound("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Permanent);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            // Ticker-specific - stop the chain
            Self::TickerNotFound(_)
            | Self::InvalidTicker(_)
            | Self::AllProvidersExhausted { .. } => RetryClass::Permanent,

            // Transient - retry the same provider with backoff
            Self::Timeout { .. } | Self::ProviderError { .. } => RetryClass::Transient,

            // Coverage gap - next provider, no penalty
            Self::NoData { .. } => RetryClass::NoCoverage,

            // Explicit quota signal - block the provider
            Self::RateLimited { .. } => RetryClass::RateLimited,

            // Unusable answer - next provider, with penalty
            Self::MalformedPayload { .. } | Self::Unauthorized { .. } => RetryClass::Failover,

            // Never reached the provider - next provider, no penalty
            Self::RateLimitExceeded { .. } | Self::NotSupported { .. } => RetryClass::Skip,
        }
    }

    /// Map a transport error from `reqwest` for the given provider.
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else if err.is_decode() {
            Self::MalformedPayload {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::ProviderError {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn no_data(provider: &str, symbol: &str) -> Self {
        Self::NoData {
            provider: provider.to_string(),
            symbol: symbol.to_string(),
        }
    }

    pub fn malformed(provider: &str, message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}
