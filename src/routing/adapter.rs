//! Per-prefix adapter configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::auth::Credential;
use crate::config::validation::ValidationError;
use crate::net::proxy::ProxyConfig;
use crate::net::tls::TlsConfig;
use crate::resilience::retries::RetryPolicy;
use crate::resilience::timeouts::TimeoutPolicy;

pub const MAX_POOL: usize = 100;
pub const MAX_LIMIT: usize = 1000;

/// Overrides applied to every request whose URL starts with the adapter's
/// prefix. Unset fields fall through to the session defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub retry: Option<RetryPolicy>,
    pub timeout: Option<TimeoutPolicy>,
    pub proxy: Option<ProxyConfig>,
    pub tls: Option<TlsConfig>,
    pub auth: Option<Credential>,
    pub headers: HashMap<String, String>,
    /// Idle connections kept for this prefix.
    pub pool: usize,
    /// Concurrent requests allowed through this prefix.
    pub limit: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            retry: None,
            timeout: None,
            proxy: None,
            tls: None,
            auth: None,
            headers: HashMap::new(),
            pool: 10,
            limit: 10,
        }
    }
}

impl AdapterConfig {
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: TimeoutPolicy) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: Credential) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_limits(mut self, pool: usize, limit: usize) -> Self {
        self.pool = pool;
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_POOL).contains(&self.pool) {
            return Err(ValidationError::Limits(format!(
                "pool size must be between 1 and {MAX_POOL}, got {}",
                self.pool
            )));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(ValidationError::Limits(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {}",
                self.limit
            )));
        }
        if self.limit > self.pool * 10 {
            return Err(ValidationError::Limits(format!(
                "limit ({}) cannot exceed 10 times the pool size ({})",
                self.limit, self.pool
            )));
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        if let Some(timeout) = &self.timeout {
            timeout.validate()?;
        }
        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
        }
        if let Some(tls) = &self.tls {
            tls.validate()?;
        }
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }
        Ok(())
    }
}
