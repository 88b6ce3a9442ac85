//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or ClientConfig built in code
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → split into ClientDefaults + persistent headers/cookies + adapter table
//!
//! Per request:
//!     session/merge.rs layers request > adapter > session defaults
//!     → EffectiveConfig (new value, stored config untouched)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; merging copies, never mutates
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ClientConfig, Limits, MountConfig, Redirects};
pub use validation::{validate_config, ValidationError};
