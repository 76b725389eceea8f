//! Per-provider attempt tracking for fetch diagnostics.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::models::ProviderId;

/// What happened when the registry considered one provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Provider was in its rate-limit cool-down and was not called.
    Blocked,

    /// Provider was not called for another reason (limiter ceiling, unsupported).
    Skipped { reason: String },

    /// Provider answered but has no data for the ticker.
    NoData,

    /// Provider answered with a quota signal; it is now blocked.
    RateLimited { error: String },

    /// Provider failed after `tries` calls.
    Failed { error: String, tries: u32 },

    /// Provider returned a usable payload.
    Succeeded { tries: u32 },
}

/// Record of a single provider during a fetch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl ProviderAttempt {
    pub fn new(provider_id: &'static str, outcome: AttemptOutcome) -> Self {
        Self {
            provider_id: Cow::Borrowed(provider_id),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded { .. })
    }
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Blocked => write!(f, "{}: blocked", self.provider_id),
            AttemptOutcome::Skipped { reason } => {
                write!(f, "{}: skipped ({})", self.provider_id, reason)
            }
            AttemptOutcome::NoData => write!(f, "{}: no data", self.provider_id),
            AttemptOutcome::RateLimited { error } => {
                write!(f, "{}: rate limited ({})", self.provider_id, error)
            }
            AttemptOutcome::Failed { error, tries } => write!(
                f,
                "{}: failed after {} {} ({})",
                self.provider_id,
                tries,
                if *tries == 1 { "try" } else { "tries" },
                error
            ),
            AttemptOutcome::Succeeded { tries } => {
                write!(f, "{}: ok after {} tries", self.provider_id, tries)
            }
        }
    }
}

/// Summary for logging and error messages.
pub fn summarize_attempts(attempts: &[ProviderAttempt]) -> String {
    if attempts.is_empty() {
        return "no capable providers".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Ordered log of the providers considered by one fetch.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, provider_id: &'static str, outcome: AttemptOutcome) {
        self.attempts.push(ProviderAttempt::new(provider_id, outcome));
    }

    pub fn summary(&self) -> String {
        summarize_attempts(&self.attempts)
    }

    /// True when at least one provider was asked and every one of them
    /// reported no data.
    pub fn all_no_data(&self) -> bool {
        !self.attempts.is_empty()
            && self
                .attempts
                .iter()
                .all(|a| matches!(a.outcome, AttemptOutcome::NoData))
    }

    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(ProviderAttempt::is_success)
    }

    pub fn into_attempts(self) -> Vec<ProviderAttempt> {
        self.attempts
    }
}
