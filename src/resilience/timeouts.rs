//! Timeout enforcement.
//!
//! # Responsibilities
//! - Describe connect, read, write and total deadlines for one call
//! - Normalize per-call overrides (bare number or full policy)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; `total` bounds each attempt
//! - Timeout errors are distinct from other errors and are retryable
//! - A bare number sets every phase to the same deadline

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::validation::ValidationError;

/// Deadlines in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    pub connect: f64,
    pub read: f64,
    pub write: f64,
    pub total: f64,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            connect: 5.0,
            read: 30.0,
            write: 10.0,
            total: 60.0,
        }
    }
}

impl TimeoutPolicy {
    /// Policy with every phase bounded by `seconds`.
    pub fn total_only(seconds: f64) -> Self {
        Self {
            connect: seconds,
            read: seconds,
            write: seconds,
            total: seconds,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("connect", self.connect),
            ("read", self.read),
            ("write", self.write),
            ("total", self.total),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ValidationError::Timeout(format!("{name} timeout must be positive")));
            }
        }
        let longest = self.connect.max(self.read).max(self.write);
        if self.total < longest {
            return Err(ValidationError::Timeout(format!(
                "total timeout ({}) must be >= the longest phase timeout ({longest})",
                self.total
            )));
        }
        Ok(())
    }

    pub fn connect_duration(&self) -> Duration {
        seconds(self.connect)
    }

    pub fn read_duration(&self) -> Duration {
        seconds(self.read)
    }

    pub fn total_duration(&self) -> Duration {
        seconds(self.total)
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// A per-call timeout: a bare number of seconds or a full policy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TimeoutOverride {
    Total(f64),
    Policy(TimeoutPolicy),
}

impl TimeoutOverride {
    pub fn resolve(self) -> TimeoutPolicy {
        match self {
            TimeoutOverride::Total(secs) => TimeoutPolicy::total_only(secs),
            TimeoutOverride::Policy(policy) => policy,
        }
    }
}

impl From<f64> for TimeoutOverride {
    fn from(secs: f64) -> Self {
        TimeoutOverride::Total(secs)
    }
}

impl From<Duration> for TimeoutOverride {
    fn from(duration: Duration) -> Self {
        TimeoutOverride::Total(duration.as_secs_f64())
    }
}

impl From<TimeoutPolicy> for TimeoutOverride {
    fn from(policy: TimeoutPolicy) -> Self {
        TimeoutOverride::Policy(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = TimeoutPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.total_duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_total_must_cover_phases() {
        let policy = TimeoutPolicy {
            total: 20.0,
            ..TimeoutPolicy::default()
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("total timeout"));
    }

    #[test]
    fn test_non_positive_rejected() {
        let policy = TimeoutPolicy {
            connect: 0.0,
            ..TimeoutPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_override_resolution() {
        let policy = TimeoutOverride::from(2.5).resolve();
        assert_eq!(policy, TimeoutPolicy::total_only(2.5));
        assert!(policy.validate().is_ok());

        let explicit = TimeoutPolicy {
            connect: 1.0,
            read: 2.0,
            write: 3.0,
            total: 4.0,
        };
        assert_eq!(TimeoutOverride::from(explicit).resolve(), explicit);
        assert_eq!(
            TimeoutOverride::from(Duration::from_millis(1500)).resolve().total,
            1.5
        );
    }
}
