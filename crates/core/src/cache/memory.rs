use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{CacheEntry, CacheKey, CacheStore};
use crate::errors::{Error, Result};

/// Durable-tier stand-in that keeps entries in process memory.
///
/// Used where no database is wanted, such as tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<BTreeMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::CacheUnavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(&key.to_string()).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(entry.key.to_string(), entry.clone());
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(&key.to_string());
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let doomed: Vec<String> = entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            entries.remove(key);
        }
        Ok(doomed.len())
    }
}
