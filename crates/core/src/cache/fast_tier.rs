use std::collections::{BTreeMap, HashMap};

use super::{CacheEntry, CacheKey};

/// Bounded in-memory tier with least-recently-used eviction.
///
/// Recency is a monotonically increasing tick; `order` maps each tick back
/// to its key so the oldest entry is the first item of the tree.
#[derive(Debug)]
pub struct FastTier {
    capacity: usize,
    tick: u64,
    entries: HashMap<CacheKey, (CacheEntry, u64)>,
    order: BTreeMap<u64, CacheKey>,
}

impl FastTier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let tick = self.next_tick();
        let (entry, used) = self.entries.get_mut(key)?;
        self.order.remove(used);
        *used = tick;
        self.order.insert(tick, key.clone());
        Some(entry.clone())
    }

    /// Insert or replace an entry, evicting the least recently used one
    /// when full. Returns the evicted key, if any.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheKey> {
        let tick = self.next_tick();
        let key = entry.key.clone();

        if let Some((_, old_tick)) = self.entries.remove(&key) {
            self.order.remove(&old_tick);
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            if let Some((_, oldest)) = self.order.pop_first() {
                self.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        self.order.insert(tick, key.clone());
        self.entries.insert(key, (entry, tick));
        evicted
    }

    pub fn remove(&mut self, key: &CacheKey) -> bool {
        match self.entries.remove(key) {
            Some((_, tick)) => {
                self.order.remove(&tick);
                true
            }
            None => false,
        }
    }

    /// Drop every entry of `symbol`. Returns how many were removed.
    pub fn remove_symbol(&mut self, symbol: &str) -> usize {
        let symbol = symbol.trim().to_ascii_uppercase();
        let doomed: Vec<CacheKey> = self
            .entries
            .keys()
            .filter(|k| k.symbol == symbol)
            .cloned()
            .collect();
        doomed.iter().filter(|k| self.remove(k)).count()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tickerlens_market_data::{DataKind, FundamentalsMap, MarketData};

    fn entry(symbol: &str, kind: DataKind) -> CacheEntry {
        CacheEntry::new(
            CacheKey::today(symbol, kind),
            MarketData::Fundamentals(FundamentalsMap::new()),
            "TEST",
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut tier = FastTier::new(2);
        let a = entry("A", DataKind::Fundamentals);
        let b = entry("B", DataKind::Fundamentals);
        let c = entry("C", DataKind::Fundamentals);

        tier.insert(a.clone());
        tier.insert(b.clone());
        // Touch A so B becomes the oldest
        assert!(tier.get(&a.key).is_some());

        let evicted = tier.insert(c.clone());
        assert_eq!(evicted, Some(b.key.clone()));
        assert!(tier.contains(&a.key));
        assert!(!tier.contains(&b.key));
        assert_eq!(tier.len(), 2);
    }

    #[test]
    fn test_replace_does_not_evict() {
        let mut tier = FastTier::new(1);
        let a = entry("A", DataKind::Fundamentals);
        tier.insert(a.clone());
        assert_eq!(tier.insert(a.clone()), None);
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_remove_symbol() {
        let mut tier = FastTier::new(10);
        tier.insert(entry("TCS", DataKind::Fundamentals));
        tier.insert(entry("TCS", DataKind::PriceSeries));
        tier.insert(entry("TCSX", DataKind::PriceSeries));

        assert_eq!(tier.remove_symbol("tcs"), 2);
        assert_eq!(tier.len(), 1);
    }
}
