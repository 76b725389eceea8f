//! Per-provider health tracking.
//!
//! Every provider moves through three states:
//!
//! - **Healthy**: normal operation.
//! - **Degraded**: `failure_threshold` failures landed within `failure_window`.
//!   The provider is still tried, the state is informational.
//! - **Blocked**: the provider sent a rate-limit signal. It is skipped until
//!   the cool-down elapses, then returns to healthy.
//!
//! A success always resets the provider to healthy. State is in-memory and
//! shared by every caller through an `Arc<HealthRegistry>`.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_FAILURE_WINDOW: Duration = Duration::from_secs(300);
/// Longest block honoured, whatever the provider's `Retry-After` says.
pub const MAX_BLOCK_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_BLOCK_COOLDOWN: Duration = Duration::from_secs(60);

/// Externally visible health of a provider.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Blocked,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthConfig {
    /// Failures within the window before a provider is degraded.
    pub failure_threshold: u32,
    /// Sliding window for counting failures.
    pub failure_window: Duration,
    /// Cool-down applied on a rate-limit signal without a Retry-After hint.
    pub block_cooldown: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            failure_window: DEFAULT_FAILURE_WINDOW,
            block_cooldown: DEFAULT_BLOCK_COOLDOWN,
        }
    }
}

#[derive(Debug, Default)]
struct ProviderHealth {
    failures: VecDeque<Instant>,
    degraded: bool,
    blocked_until: Option<Instant>,
    last_error: Option<String>,
}

impl ProviderHealth {
    fn prune(&mut self, window: Duration, now: Instant) {
        while let Some(oldest) = self.failures.front() {
            if now.duration_since(*oldest) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn state(&self, now: Instant) -> HealthState {
        match self.blocked_until {
            Some(until) if until > now => HealthState::Blocked,
            _ if self.degraded => HealthState::Degraded,
            _ => HealthState::Healthy,
        }
    }
}

/// Point-in-time view of one provider, for diagnostics endpoints.
#[derive(Clone, Debug, Serialize)]
pub struct HealthSnapshot {
    pub provider: String,
    pub state: HealthState,
    pub recent_failures: usize,
    /// Seconds left on the cool-down when blocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_for_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Process-wide provider health state machine.
///
/// Each transition happens under one lock, so concurrent outcomes for the
/// same provider are never lost.
pub struct HealthRegistry {
    providers: Mutex<HashMap<String, ProviderHealth>>,
    config: HealthConfig,
}

impl HealthRegistry {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            providers: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn lock_providers(&self) -> MutexGuard<'_, HashMap<String, ProviderHealth>> {
        self.providers.lock().unwrap_or_else(|poisoned| {
            warn!("Health registry mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Current state, clearing an expired block first.
    pub fn state(&self, provider: &str) -> HealthState {
        let mut providers = self.lock_providers();
        let now = Instant::now();

        let Some(health) = providers.get_mut(provider) else {
            return HealthState::Healthy;
        };

        if let Some(until) = health.blocked_until {
            if until <= now {
                info!("Provider health: '{}' cool-down over, back to healthy", provider);
                *health = ProviderHealth::default();
            }
        }

        health.state(now)
    }

    pub fn is_blocked(&self, provider: &str) -> bool {
        self.state(provider) == HealthState::Blocked
    }

    pub fn record_success(&self, provider: &str) {
        let mut providers = self.lock_providers();
        let health = providers.entry(provider.to_string()).or_default();

        if health.degraded || !health.failures.is_empty() {
            info!("Provider health: '{}' recovered", provider);
        }
        *health = ProviderHealth::default();
    }

    /// Count a failure toward the degraded threshold.
    pub fn record_failure(&self, provider: &str, error: &str) {
        let mut providers = self.lock_providers();
        let now = Instant::now();
        let health = providers.entry(provider.to_string()).or_default();

        health.failures.push_back(now);
        health.prune(self.config.failure_window, now);
        health.last_error = Some(error.to_string());

        let count = health.failures.len() as u32;
        if !health.degraded && count >= self.config.failure_threshold {
            warn!(
                "Provider health: '{}' degraded after {} failures within {:?}",
                provider, count, self.config.failure_window
            );
            health.degraded = true;
        } else {
            debug!(
                "Provider health: failure for '{}' ({}/{})",
                provider, count, self.config.failure_threshold
            );
        }
    }

    /// Block the provider for `retry_after`, or the configured cool-down.
    pub fn record_rate_limited(&self, provider: &str, retry_after: Option<Duration>) {
        let mut providers = self.lock_providers();
        let cooldown = retry_after
            .unwrap_or(self.config.block_cooldown)
            .min(MAX_BLOCK_COOLDOWN);
        let health = providers.entry(provider.to_string()).or_default();

        let now = Instant::now();
        health.blocked_until = now.checked_add(cooldown).or(Some(now));
        health.last_error = Some("rate limited".to_string());
        warn!(
            "Provider health: '{}' blocked for {:?} after a rate-limit signal",
            provider, cooldown
        );
    }

    pub fn recent_failures(&self, provider: &str) -> usize {
        let mut providers = self.lock_providers();
        let window = self.config.failure_window;
        providers
            .get_mut(provider)
            .map(|h| {
                h.prune(window, Instant::now());
                h.failures.len()
            })
            .unwrap_or(0)
    }

    pub fn reset(&self, provider: &str) {
        if self.lock_providers().remove(provider).is_some() {
            info!("Provider health: manually reset '{}'", provider);
        }
    }

    /// Snapshot of the given providers, in the order passed.
    pub fn snapshot<'a>(&self, provider_ids: impl IntoIterator<Item = &'a str>) -> Vec<HealthSnapshot> {
        let mut providers = self.lock_providers();
        let now = Instant::now();
        let window = self.config.failure_window;

        provider_ids
            .into_iter()
            .map(|id| match providers.get_mut(id) {
                Some(health) => {
                    health.prune(window, now);
                    HealthSnapshot {
                        provider: id.to_string(),
                        state: health.state(now),
                        recent_failures: health.failures.len(),
                        blocked_for_secs: health
                            .blocked_until
                            .filter(|until| *until > now)
                            .map(|until| until.duration_since(now).as_secs()),
                        last_error: health.last_error.clone(),
                    }
                }
                None => HealthSnapshot {
                    provider: id.to_string(),
                    state: HealthState::Healthy,
                    recent_failures: 0,
                    blocked_for_secs: None,
                    last_error: None,
                },
            })
            .collect()
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}
