//! Token bucket rate limiter for market data providers.
//!
//! Each provider gets its own bucket with a refill rate and burst capacity.
//! Acquisition suspends until a token frees up, but never longer than the
//! limiter's wait ceiling: past that it fails fast with
//! [`MarketDataError::RateLimitExceeded`] so one slow provider cannot stall
//! the caller.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::errors::MarketDataError;
use crate::provider::RateLimit;

/// Default wait ceiling for a single acquisition.
pub const DEFAULT_WAIT_CEILING: Duration = Duration::from_secs(15);

/// Token bucket for a single provider.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of available tokens.
    tokens: f64,
    /// Last time the bucket was updated.
    last_update: Instant,
    /// Token refill rate (tokens per second).
    rate: f64,
    /// Maximum bucket capacity.
    capacity: f64,
}

impl TokenBucket {
    fn from_limit(limit: &RateLimit) -> Self {
        let capacity = limit.burst_capacity.max(1) as f64;
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: limit.requests_per_minute.max(1) as f64 / 60.0,
            capacity,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.rate)
        }
    }
}

/// Proof that a call to a provider fits its budget.
#[derive(Debug, Clone, Copy)]
pub struct RatePermit {
    /// Time spent suspended before the token was granted.
    pub waited: Duration,
}

/// Per-provider token buckets shared by every caller in the process.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    limits: Mutex<HashMap<String, RateLimit>>,
    wait_ceiling: Duration,
}

impl RateLimiter {
    pub fn new(wait_ceiling: Duration) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            limits: Mutex::new(HashMap::new()),
            wait_ceiling,
        }
    }

    /// Lock the buckets mutex, recovering from poison if necessary.
    fn lock_buckets(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter buckets mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_limits(&self) -> MutexGuard<'_, HashMap<String, RateLimit>> {
        self.limits.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter limits mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Set the budget for a provider, resetting any existing bucket.
    pub fn configure(&self, provider: &str, limit: RateLimit) {
        self.lock_limits().insert(provider.to_string(), limit);
        self.lock_buckets().remove(provider);
    }

    pub fn wait_ceiling(&self) -> Duration {
        self.wait_ceiling
    }

    /// Acquire a token for the provider, suspending until one is available.
    ///
    /// Fails with `RateLimitExceeded` as soon as it is clear the token will
    /// not arrive within the wait ceiling.
    pub async fn acquire(&self, provider: &str) -> Result<RatePermit, MarketDataError> {
        let started = Instant::now();

        loop {
            let wait_time = {
                let mut buckets = self.lock_buckets();
                let bucket = match buckets.get_mut(provider) {
                    Some(bucket) => bucket,
                    None => {
                        let bucket = self.create_bucket(provider);
                        buckets.entry(provider.to_string()).or_insert(bucket)
                    }
                };

                if bucket.try_acquire() {
                    let waited = started.elapsed();
                    debug!(
                        "Rate limiter: acquired token for '{}' after {:?}",
                        provider, waited
                    );
                    return Ok(RatePermit { waited });
                }

                bucket.time_until_available()
            };

            if started.elapsed() + wait_time > self.wait_ceiling {
                warn!(
                    "Rate limiter: '{}' needs {:?} more, over the {:?} ceiling",
                    provider, wait_time, self.wait_ceiling
                );
                return Err(MarketDataError::RateLimitExceeded {
                    provider: provider.to_string(),
                    waited: self.wait_ceiling,
                });
            }

            debug!(
                "Rate limiter: waiting {:?} for provider '{}'",
                wait_time, provider
            );
            tokio::time::sleep(wait_time).await;
        }
    }

    /// Try to acquire a token without waiting.
    pub fn try_acquire(&self, provider: &str) -> bool {
        let mut buckets = self.lock_buckets();
        match buckets.get_mut(provider) {
            Some(bucket) => bucket.try_acquire(),
            None => {
                let bucket = self.create_bucket(provider);
                buckets
                    .entry(provider.to_string())
                    .or_insert(bucket)
                    .try_acquire()
            }
        }
    }

    /// Tokens currently available to a provider.
    pub fn remaining_tokens(&self, provider: &str) -> f64 {
        let mut buckets = self.lock_buckets();

        match buckets.get_mut(provider) {
            Some(bucket) => {
                bucket.refill();
                bucket.tokens
            }
            None => self.create_bucket(provider).capacity,
        }
    }

    pub fn reset(&self, provider: &str) {
        self.lock_buckets().remove(provider);
    }

    fn create_bucket(&self, provider: &str) -> TokenBucket {
        let limits = self.lock_limits();
        let limit = limits.get(provider).cloned().unwrap_or_default();
        TokenBucket::from_limit(&limit)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_CEILING)
    }
}
