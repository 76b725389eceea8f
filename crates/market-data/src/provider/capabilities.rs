//! Provider capabilities and rate limiting configuration.

use crate::models::DataKind;

/// Describes what a market data provider can serve.
///
/// The registry only routes a request to providers whose `data_kinds`
/// include the requested kind.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Data kinds this provider answers (price series, fundamentals).
    pub data_kinds: &'static [DataKind],

    /// Whether the provider needs an API key to be registered at all.
    pub requires_api_key: bool,
}

impl ProviderCapabilities {
    pub fn supports(&self, kind: DataKind) -> bool {
        self.data_kinds.contains(&kind)
    }
}

/// Token budget for a provider.
///
/// Controls how aggressively we can call a provider to avoid
/// hitting their rate limits and getting blocked.
#[derive(Clone, Debug)]
pub struct RateLimit {
    /// Sustained refill rate.
    pub requests_per_minute: u32,

    /// Calls that may be made back to back before the refill rate applies.
    pub burst_capacity: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst_capacity: 5,
        }
    }
}
