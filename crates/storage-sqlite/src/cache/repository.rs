use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;

use super::model::CacheEntryDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::cache_entries::dsl as cache_dsl;
use tickerlens_core::cache::{CacheEntry, CacheKey, CacheStore};
use tickerlens_core::Result;

const LIKE_ESCAPE: char = '\\';

/// SQLite-backed durable cache tier.
pub struct SqliteCacheStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteCacheStore {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Delete every row whose TTL ran out before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now.naive_utc();
        let removed = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(cache_dsl::cache_entries.filter(cache_dsl::expires_at.lt(cutoff)))
                    .execute(conn)
                    .map_err(StorageError::from)
                    .map_err(Into::into)
            })
            .await?;
        debug!("Purged {} expired cache rows", removed);
        Ok(removed)
    }

    /// Number of stored rows, fresh or not.
    pub fn count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        cache_dsl::cache_entries
            .count()
            .get_result(&mut conn)
            .into_core()
    }
}

/// `LIKE` pattern matching keys that start with `prefix` literally.
fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let row = cache_dsl::cache_entries
            .find(key.to_string())
            .select(CacheEntryDB::as_select())
            .first(&mut conn)
            .optional()
            .into_core()?;
        row.map(CacheEntry::try_from).transpose()
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        let row = CacheEntryDB::try_from(entry)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::replace_into(cache_dsl::cache_entries)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let cache_key = key.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(cache_dsl::cache_entries.find(cache_key))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let pattern = prefix_pattern(prefix);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let removed = diesel::delete(
                    cache_dsl::cache_entries
                        .filter(cache_dsl::cache_key.like(pattern).escape(LIKE_ESCAPE)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(removed)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use std::time::Duration;
    use tempfile::tempdir;
    use tickerlens_market_data::{DataKind, FundamentalsMap, MarketData, OhlcvBar, PriceSeries};

    async fn create_test_store() -> (SqliteCacheStore, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("cache.db");
        let db_path = db_path.to_string_lossy().to_string();

        crate::db::init(&db_path).expect("Failed to init database");
        let pool = create_pool(&db_path).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        (SqliteCacheStore::new(pool, writer), temp_dir)
    }

    fn fundamentals_entry(symbol: &str, pe: f64, ttl: Duration) -> CacheEntry {
        let mut map = FundamentalsMap::new();
        map.insert_number("trailing_pe", pe);
        map.insert_text("sector", "Technology");
        CacheEntry::new(
            CacheKey::today(symbol, DataKind::Fundamentals),
            MarketData::Fundamentals(map),
            "YAHOO",
            ttl,
        )
    }

    #[tokio::test]
    async fn test_put_and_get_preserve_the_entry() {
        let (store, _dir) = create_test_store().await;
        let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let series = PriceSeries::from_sorted(vec![
            OhlcvBar::new(day, 10.0, 11.0, 9.5, 10.5, 1200.0),
            OhlcvBar::new(day.succ_opt().unwrap(), 10.5, 12.0, 10.0, 11.5, 900.0),
        ])
        .unwrap();
        let entry = CacheEntry::new(
            CacheKey::today("TCS", DataKind::PriceSeries),
            MarketData::PriceSeries(series),
            "STOOQ",
            Duration::from_secs(3600),
        );

        store.put(&entry).await.unwrap();
        let loaded = store.get(&entry.key).unwrap().expect("entry stored");

        assert_eq!(loaded.key, entry.key);
        assert_eq!(loaded.payload, entry.payload);
        assert_eq!(loaded.source_provider, "STOOQ");
        assert_eq!(loaded.ttl_seconds, 3600);
        let drift = (loaded.fetched_at - entry.fetched_at).num_milliseconds().abs();
        assert!(drift < 1);
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let (store, _dir) = create_test_store().await;
        let key = CacheKey::today("NOPE", DataKind::PriceSeries);
        assert!(store.get(&key).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_row() {
        let (store, _dir) = create_test_store().await;
        let ttl = Duration::from_secs(60);

        store.put(&fundamentals_entry("INFY", 20.0, ttl)).await.unwrap();
        let newer = fundamentals_entry("INFY", 24.0, ttl);
        store.put(&newer).await.unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get(&newer.key).unwrap().unwrap().payload, newer.payload);
    }

    #[tokio::test]
    async fn test_delete_removes_only_that_key() {
        let (store, _dir) = create_test_store().await;
        let ttl = Duration::from_secs(60);
        let a = fundamentals_entry("TCS", 30.0, ttl);
        let b = fundamentals_entry("INFY", 25.0, ttl);
        store.put(&a).await.unwrap();
        store.put(&b).await.unwrap();

        store.delete(&a.key).await.unwrap();
        store.delete(&a.key).await.unwrap();

        assert!(store.get(&a.key).unwrap().is_none());
        assert!(store.get(&b.key).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_prefix_treats_wildcards_literally() {
        let (store, _dir) = create_test_store().await;
        let ttl = Duration::from_secs(60);
        store.put(&fundamentals_entry("M_M", 18.0, ttl)).await.unwrap();
        store.put(&fundamentals_entry("MXM", 19.0, ttl)).await.unwrap();
        store.put(&fundamentals_entry("M_MFIN", 12.0, ttl)).await.unwrap();

        let removed = store
            .delete_prefix(&CacheKey::symbol_prefix("M_M"))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_fresh_rows() {
        let (store, _dir) = create_test_store().await;
        let mut stale = fundamentals_entry("TCS", 30.0, Duration::from_secs(60));
        stale.fetched_at = stale.fetched_at - chrono::Duration::seconds(600);
        let fresh = fundamentals_entry("INFY", 25.0, Duration::from_secs(600));
        store.put(&stale).await.unwrap();
        store.put(&fresh).await.unwrap();

        let removed = store.purge_expired(Utc::now()).await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.get(&stale.key).unwrap().is_none());
        assert!(store.get(&fresh.key).unwrap().is_some());
    }

    #[test]
    fn test_prefix_pattern_escapes_like_wildcards() {
        assert_eq!(prefix_pattern("TCS|"), "TCS|%");
        assert_eq!(prefix_pattern("M_M|"), "M\\_M|%");
        assert_eq!(prefix_pattern("50%|"), "50\\%|%");
    }
}
