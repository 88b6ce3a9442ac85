//! Adapter routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request URL (absolute, after endpoint resolution)
//!     → router.rs (scan mounted adapters)
//!     → matcher.rs (string prefix test)
//!     → AdapterRoute { prefix, config, permits } or the all-defaults fallback
//!     → session/merge.rs layers it between session defaults and the request
//! ```
//!
//! # Design Decisions
//! - Longest prefix wins; ties go to the first registered
//! - Deterministic: same input always matches same adapter
//! - Each adapter owns a semaphore sized by its `limit`

pub mod adapter;
pub mod matcher;
pub mod router;

pub use adapter::AdapterConfig;
pub use router::{AdapterRoute, AdapterRouter};
