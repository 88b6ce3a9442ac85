//! Three-tier configuration merge.
//!
//! # Precedence
//! ```text
//! request options  >  adapter (longest matching prefix)  >  session defaults
//!
//! headers:  session → adapter → request, same name (any case) overwritten
//! cookies:  session → request, plain key overwrite
//! ```
//!
//! Every merge builds new maps. Stored state is never touched.

use std::collections::HashMap;

use crate::auth::Credential;
use crate::config::schema::{ClientConfig, Limits, Redirects};
use crate::http::request::RequestOptions;
use crate::net::proxy::ProxyConfig;
use crate::net::tls::TlsConfig;
use crate::resilience::retries::RetryPolicy;
use crate::resilience::timeouts::TimeoutPolicy;
use crate::routing::adapter::AdapterConfig;

/// Client-wide defaults, the lowest precedence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDefaults {
    pub timeout: TimeoutPolicy,
    pub retry: RetryPolicy,
    pub redirects: Redirects,
    pub proxy: Option<ProxyConfig>,
    pub tls: TlsConfig,
    pub auth: Option<Credential>,
    pub limits: Limits,
}

impl ClientDefaults {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            timeout: config.timeout,
            retry: config.retry.clone(),
            redirects: config.redirects,
            proxy: config.proxy.clone(),
            tls: config.tls.clone(),
            auth: config.auth.clone(),
            limits: config.limits.clone(),
        }
    }
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// Headers and cookies sent with every request of a client or session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistentState {
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
}

impl PersistentState {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            headers: config.headers.clone(),
            cookies: config.cookies.clone(),
        }
    }
}

/// The configuration one request actually runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub retry: RetryPolicy,
    pub timeout: TimeoutPolicy,
    pub redirects: Redirects,
    pub allow_redirects: bool,
    pub proxy: Option<ProxyConfig>,
    pub tls: TlsConfig,
    pub auth: Option<Credential>,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub pool: usize,
}

/// Layer the request over the adapter over the defaults.
pub fn resolve(
    defaults: &ClientDefaults,
    persistent: &PersistentState,
    adapter: &AdapterConfig,
    request: &RequestOptions,
) -> EffectiveConfig {
    let timeout = match request.timeout {
        Some(timeout) => timeout.resolve(),
        None => adapter.timeout.unwrap_or(defaults.timeout),
    };

    let mut headers = persistent.headers.clone();
    merge_headers(&mut headers, &adapter.headers);
    merge_headers(&mut headers, &request.headers);

    let mut cookies = persistent.cookies.clone();
    cookies.extend(request.cookies.iter().map(|(k, v)| (k.clone(), v.clone())));

    EffectiveConfig {
        retry: pick(&request.retry, &adapter.retry, &defaults.retry),
        timeout,
        redirects: defaults.redirects,
        allow_redirects: request.allow_redirects.unwrap_or(defaults.redirects.limit > 0),
        proxy: request.proxy.clone().or_else(|| adapter.proxy.clone()).or_else(|| defaults.proxy.clone()),
        tls: pick(&request.tls, &adapter.tls, &defaults.tls),
        auth: request.auth.clone().or_else(|| adapter.auth.clone()).or_else(|| defaults.auth.clone()),
        headers,
        cookies,
        pool: adapter.pool,
    }
}

fn pick<T: Clone>(request: &Option<T>, adapter: &Option<T>, default: &T) -> T {
    request.as_ref().or(adapter.as_ref()).unwrap_or(default).clone()
}

/// Overlay `layer` onto `base`, replacing names that differ only in case.
pub fn merge_headers(base: &mut HashMap<String, String>, layer: &HashMap<String, String>) {
    for (name, value) in layer {
        set_header(base, name, value.clone());
    }
}

/// Insert a header, dropping any existing entry with the same name in another case.
pub fn set_header(headers: &mut HashMap<String, String>, name: &str, value: impl Into<String>) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.into());
}

/// Case-insensitive header lookup.
pub fn get_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
