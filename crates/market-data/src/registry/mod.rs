//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - Provider registration and priority ordering
//! - Rate limiting per provider
//! - Health tracking (healthy / degraded / blocked)
//! - Backoff for transient retries
//! - Per-provider diagnostics for exhausted fetches

mod backoff;
mod diagnostics;
mod health;
mod provider_registry;
mod rate_limiter;

pub use backoff::BackoffPolicy;
pub use diagnostics::{summarize_attempts, AttemptOutcome, FetchDiagnostics, ProviderAttempt};
pub use health::{HealthConfig, HealthRegistry, HealthSnapshot, HealthState};
pub use provider_registry::{ProviderDescriptor, ProviderRegistry, RegistryConfig};
pub use rate_limiter::{RatePermit, RateLimiter, DEFAULT_WAIT_CEILING};
