use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single fundamentals value. Field meaning is left to the consumer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FundamentalValue {
    Number(f64),
    Text(String),
}

impl FundamentalValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FundamentalValue::Number(n) => Some(*n),
            FundamentalValue::Text(_) => None,
        }
    }
}

impl From<f64> for FundamentalValue {
    fn from(value: f64) -> Self {
        FundamentalValue::Number(value)
    }
}

impl From<String> for FundamentalValue {
    fn from(value: String) -> Self {
        FundamentalValue::Text(value)
    }
}

/// Opaque, ordered key-value map of fundamentals for one ticker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundamentalsMap(BTreeMap<String, FundamentalValue>);

impl FundamentalsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a numeric metric, skipping non-finite values.
    pub fn insert_number(&mut self, key: impl Into<String>, value: f64) {
        if value.is_finite() {
            self.0.insert(key.into(), FundamentalValue::Number(value));
        }
    }

    pub fn insert_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.0.insert(key.into(), FundamentalValue::Text(value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&FundamentalValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FundamentalValue)> {
        self.0.iter()
    }
}
