//! Two-tier cache for normalized market data.
//!
//! - `key` - Ticker query keys (`SYMBOL|data_kind|YYYY-MM-DD`)
//! - `entry` - Cached payloads with TTL-based freshness
//! - `fast_tier` - Bounded LRU held in memory
//! - `store` - The durable tier contract, implemented on SQLite by the storage crate
//! - `two_tier` - Composition of both tiers with write-through

mod entry;
mod fast_tier;
mod key;
mod memory;
mod store;
mod two_tier;

pub use entry::CacheEntry;
pub use fast_tier::FastTier;
pub use key::CacheKey;
pub use memory::MemoryCacheStore;
pub use store::CacheStore;
pub use two_tier::{CacheTier, TwoTierCache};
