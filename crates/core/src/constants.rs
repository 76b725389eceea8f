/// Price-series cache TTL
pub const DEFAULT_PRICE_TTL_SECS: u64 = 3600;

/// Fundamentals cache TTL
pub const DEFAULT_FUNDAMENTALS_TTL_SECS: u64 = 86_400;

/// Entries held by the in-memory cache tier
pub const DEFAULT_FAST_CAPACITY: usize = 512;

/// Ceiling on waiting for an in-flight fetch of the same key
pub const DEFAULT_FETCH_WAIT_CEILING_SECS: u64 = 120;

/// Tickers analyzed at once by a batch
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Decimal places for indicator values
pub const VALUE_PRECISION: i32 = 4;

/// Decimal places for candle percentages
pub const PERCENT_PRECISION: i32 = 2;
