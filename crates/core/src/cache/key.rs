use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tickerlens_market_data::DataKind;

use crate::errors::Error;

const SEPARATOR: char = '|';

/// Ticker query key: `(symbol, data_kind, as_of_bucket)`.
///
/// The bucket is the UTC calendar day, so repeat lookups within a day share
/// an entry. Renders as `SYMBOL|data_kind|YYYY-MM-DD`; every key of a symbol
/// starts with [`CacheKey::symbol_prefix`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CacheKey {
    pub symbol: String,
    pub data_kind: DataKind,
    pub bucket: NaiveDate,
}

impl CacheKey {
    pub fn new(symbol: &str, data_kind: DataKind, bucket: NaiveDate) -> Self {
        Self {
            symbol: symbol.trim().to_ascii_uppercase(),
            data_kind,
            bucket,
        }
    }

    /// Key in today's bucket.
    pub fn today(symbol: &str, data_kind: DataKind) -> Self {
        Self::new(symbol, data_kind, Utc::now().date_naive())
    }

    /// Prefix shared by every key of `symbol`.
    pub fn symbol_prefix(symbol: &str) -> String {
        format!("{}{}", symbol.trim().to_ascii_uppercase(), SEPARATOR)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.symbol,
            self.data_kind,
            self.bucket.format("%Y-%m-%d"),
            sep = SEPARATOR
        )
    }
}

impl FromStr for CacheKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Unexpected(format!("malformed cache key '{}'", s));
        let mut parts = s.split(SEPARATOR);
        let (Some(symbol), Some(kind), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let data_kind = kind.parse::<DataKind>().map_err(|_| invalid())?;
        let bucket = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| invalid())?;
        if symbol.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(symbol, data_kind, bucket))
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for CacheKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
