//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::auth::Credential;
use crate::config::validation::ValidationError;
use crate::net::proxy::ProxyConfig;
use crate::net::tls::TlsConfig;
use crate::resilience::retries::RetryPolicy;
use crate::resilience::timeouts::TimeoutPolicy;
use crate::routing::adapter::AdapterConfig;

/// Root configuration for a client or session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL that relative request paths are resolved against.
    pub endpoint: String,

    /// Connection pool limits handed to the transport.
    pub limits: Limits,

    /// Default timeout policy.
    pub timeout: TimeoutPolicy,

    /// Default retry policy.
    pub retry: RetryPolicy,

    /// Redirect following.
    pub redirects: Redirects,

    /// Default proxy, if any.
    pub proxy: Option<ProxyConfig>,

    /// Default TLS settings.
    pub tls: TlsConfig,

    /// Default credential, if any.
    pub auth: Option<Credential>,

    /// Cookies sent with every request.
    pub cookies: HashMap<String, String>,

    /// Headers sent with every request.
    pub headers: HashMap<String, String>,

    /// Adapters mounted at construction, in registration order.
    pub adapters: Vec<MountConfig>,
}

impl ClientConfig {
    /// Default configuration pointed at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost".to_string(),
            limits: Limits::default(),
            timeout: TimeoutPolicy::default(),
            retry: RetryPolicy::default(),
            redirects: Redirects::default(),
            proxy: None,
            tls: TlsConfig::default(),
            auth: None,
            cookies: HashMap::new(),
            headers: HashMap::new(),
            adapters: Vec::new(),
        }
    }
}

/// An adapter declared in a config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MountConfig {
    /// URL prefix the adapter applies to (e.g. "https://api.example.com/").
    pub prefix: String,

    #[serde(flatten)]
    pub adapter: AdapterConfig,
}

/// Connection pool limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum total connections across all hosts.
    pub connections: usize,

    /// Idle keepalive connections kept for reuse.
    pub keepalive: usize,

    /// Maximum connections per host.
    pub per_host: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            connections: 50,
            keepalive: 10,
            per_host: 20,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.connections == 0 {
            return Err(ValidationError::Limits("total connections must be positive".into()));
        }
        if self.per_host == 0 {
            return Err(ValidationError::Limits("host connections must be positive".into()));
        }
        if self.keepalive > self.connections {
            return Err(ValidationError::Limits(
                "keepalive connections cannot exceed total connections".into(),
            ));
        }
        if self.per_host > self.connections {
            return Err(ValidationError::Limits(
                "per-host connections cannot exceed total connections".into(),
            ));
        }
        Ok(())
    }
}

/// Redirect following configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Redirects {
    /// Maximum redirects to follow; 0 disables following.
    pub limit: u32,
}

impl Default for Redirects {
    fn default() -> Self {
        Self { limit: 10 }
    }
}

impl Redirects {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.limit > 50 {
            tracing::warn!(
                limit = self.limit,
                "Redirect limit is unusually high; check this is intentional"
            );
        }
        Ok(())
    }
}
