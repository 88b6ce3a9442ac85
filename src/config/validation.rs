//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid, status codes in range)
//! - Check pairings (TLS cert/key, proxy username/password)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, and again on per-call overrides

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::net::endpoint::Endpoint;

/// A single semantic problem in a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("invalid limits: {0}")]
    Limits(String),

    #[error("invalid retry policy: {0}")]
    Retry(String),

    #[error("invalid timeout policy: {0}")]
    Timeout(String),

    #[error("invalid redirects: {0}")]
    Redirects(String),

    #[error("invalid proxy: {0}")]
    Proxy(String),

    #[error("invalid TLS configuration: {0}")]
    Tls(String),

    #[error("invalid credential: {0}")]
    Auth(String),

    #[error("invalid adapter for prefix '{prefix}': {reason}")]
    Adapter { prefix: String, reason: String },
}

/// Validate a full client configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let checks = [
        Endpoint::parse(&config.endpoint).map(drop),
        config.limits.validate(),
        config.timeout.validate(),
        config.retry.validate(),
        config.redirects.validate(),
        config.tls.validate(),
        config.proxy.as_ref().map_or(Ok(()), |proxy| proxy.validate()),
        config.auth.as_ref().map_or(Ok(()), |auth| auth.validate()),
    ];

    let mut errors: Vec<ValidationError> = checks.into_iter().filter_map(Result::err).collect();

    for mount in &config.adapters {
        if let Err(e) = mount.adapter.validate() {
            errors.push(ValidationError::Adapter {
                prefix: mount.prefix.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
