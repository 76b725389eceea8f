//! Database model for cache entries.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use tickerlens_core::cache::{CacheEntry, CacheKey};
use tickerlens_core::errors::Error;

/// One row of `cache_entries`. The payload is the JSON-encoded `MarketData`.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::cache_entries)]
#[diesel(primary_key(cache_key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CacheEntryDB {
    pub cache_key: String,
    pub symbol: String,
    pub data_kind: String,
    pub bucket: String,
    pub payload: String,
    pub source_provider: String,
    pub fetched_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub ttl_seconds: i64,
}

impl TryFrom<&CacheEntry> for CacheEntryDB {
    type Error = Error;

    fn try_from(entry: &CacheEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            cache_key: entry.key.to_string(),
            symbol: entry.key.symbol.clone(),
            data_kind: entry.key.data_kind.to_string(),
            bucket: entry.key.bucket.format("%Y-%m-%d").to_string(),
            payload: serde_json::to_string(&entry.payload)?,
            source_provider: entry.source_provider.clone(),
            fetched_at: entry.fetched_at.naive_utc(),
            expires_at: entry.expires_at().naive_utc(),
            ttl_seconds: i64::try_from(entry.ttl_seconds).unwrap_or(i64::MAX),
        })
    }
}

impl TryFrom<CacheEntryDB> for CacheEntry {
    type Error = Error;

    fn try_from(row: CacheEntryDB) -> Result<Self, Self::Error> {
        let key: CacheKey = row.cache_key.parse()?;
        Ok(CacheEntry {
            key,
            payload: serde_json::from_str(&row.payload)?,
            fetched_at: Utc.from_utc_datetime(&row.fetched_at),
            source_provider: row.source_provider,
            ttl_seconds: u64::try_from(row.ttl_seconds).unwrap_or(0),
        })
    }
}
