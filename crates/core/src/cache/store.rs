use async_trait::async_trait;

use super::{CacheEntry, CacheKey};
use crate::errors::Result;

/// Durable cache tier.
///
/// Keyed by the rendered [`CacheKey`]. Reads are synchronous point lookups;
/// writes are async so an implementation can funnel them through a single
/// writer.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Point lookup. Returns the entry even when it is stale.
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Insert or replace.
    async fn put(&self, entry: &CacheEntry) -> Result<()>;

    /// Point delete. Deleting a missing key is not an error.
    async fn delete(&self, key: &CacheKey) -> Result<()>;

    /// Delete every key starting with `prefix`. Returns the number removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize>;
}
