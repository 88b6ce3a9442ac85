//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt n against the transport:
//!     → timeouts.rs (total deadline wraps the attempt)
//!     → On failure or retryable status: retries.rs (classify, compute delay)
//!     → backoff.rs (factor × 2^n, no jitter)
//!     → tokio::time::sleep, then attempt n+1
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Policies are pure values; the orchestrator owns the loop
//! - Sleeping yields to the runtime so other requests keep flowing

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{AttemptState, RetryDecision, RetryPolicy};
pub use timeouts::{TimeoutOverride, TimeoutPolicy};
