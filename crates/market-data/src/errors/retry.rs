/// Classification for retry policy.
///
/// Used to determine how the registry should respond to errors from providers.
///
/// # Behavior Summary
///
/// | Class | Retry same provider? | Try next provider? | Health effect |
/// |-------|----------------------|--------------------|---------------|
/// | `Permanent` | No | No | None |
/// | `Transient` | Yes, with backoff | Yes, after retries | Failure recorded |
/// | `RateLimited` | No | Yes | Provider blocked for a cool-down |
/// | `Failover` | No | Yes | Failure recorded |
/// | `NoCoverage` | No | Yes | None |
/// | `Skip` | No | Yes | None |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Ticker-specific failure (e.g. unknown symbol).
    ///
    /// Every provider would answer the same way, so the chain stops and the
    /// error propagates without penalizing the provider.
    Permanent,

    /// Timeout, 5xx or a dropped connection.
    ///
    /// The same provider is retried with exponential backoff up to the retry
    /// budget. Each failed attempt counts toward the degraded threshold.
    Transient,

    /// The provider explicitly signalled a quota (HTTP 429 or an API note).
    ///
    /// The provider is blocked for a cool-down and the registry moves on
    /// immediately.
    RateLimited,

    /// The provider answered but the answer is unusable (malformed payload,
    /// rejected credentials). Retrying will not help; try the next provider
    /// and record the failure.
    Failover,

    /// The provider answered that it has no data for this ticker.
    ///
    /// The gap is provider-specific, so the next provider is tried without
    /// penalty. When every provider asked says the same, the fetch ends as
    /// `TickerNotFound`.
    NoCoverage,

    /// The provider could not be asked at all (local limiter ceiling,
    /// unsupported operation). Move on without any penalty.
    Skip,
}

impl RetryClass {
    /// Whether the failure counts against the provider's health.
    pub fn penalizes(&self) -> bool {
        matches!(self, RetryClass::Transient | RetryClass::Failover)
    }
}
