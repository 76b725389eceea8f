use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tickerlens_market_data::MarketData;

use super::{CacheEntry, CacheKey, CacheStore, FastTier};

/// Which tier answered a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheTier {
    Fast,
    Durable,
}

/// Fast in-memory tier in front of a durable [`CacheStore`].
///
/// Reads go fast tier first, then durable, backfilling the fast tier on a
/// durable hit. Writes land in both tiers before `put` returns. If the
/// durable store fails the cache keeps working on the fast tier alone.
pub struct TwoTierCache<S: CacheStore> {
    fast: Mutex<FastTier>,
    durable: Arc<S>,
}

impl<S: CacheStore> TwoTierCache<S> {
    pub fn new(durable: Arc<S>, fast_capacity: usize) -> Self {
        Self {
            fast: Mutex::new(FastTier::new(fast_capacity)),
            durable,
        }
    }

    pub fn durable(&self) -> &Arc<S> {
        &self.durable
    }

    fn fast(&self) -> MutexGuard<'_, FastTier> {
        self.fast.lock().unwrap_or_else(|poisoned| {
            warn!("Fast cache tier lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Fresh entry for `key`, or `None` on a miss.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.get_with_tier(key).map(|(entry, _)| entry)
    }

    /// Like [`get`](Self::get), also reporting which tier answered.
    pub fn get_with_tier(&self, key: &CacheKey) -> Option<(CacheEntry, CacheTier)> {
        {
            let mut fast = self.fast();
            match fast.get(key) {
                Some(entry) if entry.is_fresh() => {
                    debug!("Cache hit (fast) for {}", key);
                    return Some((entry, CacheTier::Fast));
                }
                Some(_) => {
                    debug!("Stale fast entry for {}", key);
                    fast.remove(key);
                }
                None => {}
            }
        }

        match self.durable.get(key) {
            Ok(Some(entry)) if entry.is_fresh() => {
                debug!("Cache hit (durable) for {}, backfilling fast tier", key);
                self.fast().insert(entry.clone());
                Some((entry, CacheTier::Durable))
            }
            Ok(Some(_)) => {
                debug!("Stale durable entry for {}", key);
                None
            }
            Ok(None) => {
                debug!("Cache miss for {}", key);
                None
            }
            Err(e) => {
                warn!("Durable cache unavailable on read of {}: {}", key, e);
                None
            }
        }
    }

    /// Build an entry stamped now and write it through both tiers.
    pub async fn put(
        &self,
        key: CacheKey,
        payload: MarketData,
        source_provider: &str,
        ttl: Duration,
    ) -> CacheEntry {
        let entry = CacheEntry::new(key, payload, source_provider, ttl);
        self.put_entry(entry.clone()).await;
        entry
    }

    /// Write an existing entry through both tiers.
    pub async fn put_entry(&self, entry: CacheEntry) {
        if let Some(evicted) = self.fast().insert(entry.clone()) {
            debug!("Evicted {} from fast tier", evicted);
        }
        if let Err(e) = self.durable.put(&entry).await {
            warn!(
                "Durable cache unavailable on write of {}, keeping fast tier only: {}",
                entry.key, e
            );
        }
    }

    /// Remove one key from both tiers.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.fast().remove(key);
        if let Err(e) = self.durable.delete(key).await {
            warn!("Durable cache unavailable on delete of {}: {}", key, e);
        }
    }

    /// Remove every key of `symbol` from both tiers. Returns how many
    /// entries were removed from the fast tier and the durable tier.
    pub async fn invalidate_all(&self, symbol: &str) -> (usize, usize) {
        let fast_removed = self.fast().remove_symbol(symbol);
        let durable_removed = match self
            .durable
            .delete_prefix(&CacheKey::symbol_prefix(symbol))
            .await
        {
            Ok(n) => n,
            Err(e) => {
                warn!("Durable cache unavailable on clear of {}: {}", symbol, e);
                0
            }
        };
        debug!(
            "Cleared {}: {} fast, {} durable",
            symbol, fast_removed, durable_removed
        );
        (fast_removed, durable_removed)
    }

    pub fn fast_len(&self) -> usize {
        self.fast().len()
    }
}
