//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether an attempt outcome is retried, succeeds, or fails
//! - Compute the backoff before the next attempt
//!
//! # State Transitions
//! ```text
//! Attempting(n) ── transport error, retryable, n < attempts ──▶ sleep delay(n) ─▶ Attempting(n+1)
//! Attempting(n) ── status ∈ retryable, n < attempts ─────────▶ sleep delay(n) ─▶ Attempting(n+1)
//! Attempting(n) ── retryable outcome, n == attempts ─────────▶ Exhausted
//! Attempting(n) ── non-retryable error or status ≥ 400 ─────▶ Failed
//! Attempting(n) ── anything else ────────────────────────────▶ Succeeded
//! ```
//!
//! # Design Decisions
//! - Connection and timeout failures are retryable; protocol failures are not
//! - Retries apply to every method; callers accept at-least-once delivery
//! - No jitter: delay(n) is exactly backoff_factor × 2^n

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::validation::ValidationError;
use crate::net::transport::TransportError;
use crate::resilience::backoff::calculate_backoff;

/// Retry configuration for failed requests.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    #[serde(alias = "total")]
    pub attempts: u32,

    /// Base of the exponential backoff, in seconds.
    #[serde(alias = "backoff")]
    pub backoff_factor: f64,

    /// Statuses that trigger a retry.
    #[serde(alias = "status")]
    pub retryable_statuses: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_factor: 1.0,
            retryable_statuses: BTreeSet::from([500, 502, 503, 504]),
        }
    }
}

/// Where a request is in its retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Attempting(u32),
    Succeeded,
    Exhausted,
    Failed,
}

/// What to do with the outcome of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then make the next attempt.
    Retry(Duration),
    /// Hand the response to the caller.
    Succeed,
    /// Retryable outcome with no budget left.
    Exhausted,
    /// Outcome that is never retried.
    Fail,
}

impl RetryDecision {
    /// State the request moves to after attempt `attempt`.
    pub fn next_state(&self, attempt: u32) -> AttemptState {
        match self {
            RetryDecision::Retry(_) => AttemptState::Attempting(attempt + 1),
            RetryDecision::Succeed => AttemptState::Succeeded,
            RetryDecision::Exhausted => AttemptState::Exhausted,
            RetryDecision::Fail => AttemptState::Failed,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            attempts: 0,
            ..Self::default()
        }
    }

    /// Builder-style override of the retry count.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Builder-style override of the backoff factor.
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Builder-style override of the retryable statuses.
    #[must_use]
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.backoff_factor > 0.0 && self.backoff_factor.is_finite()) {
            return Err(ValidationError::Retry("backoff factor must be positive".into()));
        }
        if self.retryable_statuses.is_empty() {
            return Err(ValidationError::Retry("status codes list cannot be empty".into()));
        }
        if let Some(code) = self
            .retryable_statuses
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(ValidationError::Retry(format!("invalid HTTP status code: {code}")));
        }
        Ok(())
    }

    /// Backoff before the attempt that follows attempt `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.backoff_factor)
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Classify a response status received on attempt `attempt`.
    pub fn on_status(&self, attempt: u32, status: u16) -> RetryDecision {
        if self.is_retryable_status(status) {
            self.retry_or_exhaust(attempt)
        } else if status >= 400 {
            RetryDecision::Fail
        } else {
            RetryDecision::Succeed
        }
    }

    /// Classify a transport failure on attempt `attempt`.
    pub fn on_error(&self, attempt: u32, error: &TransportError) -> RetryDecision {
        if error.is_retryable() {
            self.retry_or_exhaust(attempt)
        } else {
            RetryDecision::Fail
        }
    }

    fn retry_or_exhaust(&self, attempt: u32) -> RetryDecision {
        if attempt < self.attempts {
            RetryDecision::Retry(self.delay(attempt))
        } else {
            RetryDecision::Exhausted
        }
    }
}
