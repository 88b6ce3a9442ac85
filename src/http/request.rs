//! Per-call request options.
//!
//! # Responsibilities
//! - Collect headers, query parameters, cookies and the body for one call
//! - Carry per-call overrides (timeout, retry, redirects, auth, proxy, TLS)
//! - Encode the body and set its content type
//!
//! # Design Decisions
//! - Builder by value, like the rest of the crate's config types
//! - A caller-supplied Content-Type always wins
//! - Cookies are rendered as one `Cookie` header in key order

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::auth::Credential;
use crate::net::proxy::ProxyConfig;
use crate::net::tls::TlsConfig;
use crate::resilience::retries::RetryPolicy;
use crate::resilience::timeouts::TimeoutOverride;
use crate::session::merge::{get_header, set_header};

pub use reqwest::Method;

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes(Bytes),
    Text(String),
    Json(Value),
    Form(Vec<(String, String)>),
}

impl RequestBody {
    fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Empty | RequestBody::Bytes(_) => None,
            RequestBody::Text(_) => Some("text/plain; charset=utf-8"),
            RequestBody::Json(_) => Some("application/json"),
            RequestBody::Form(_) => Some("application/x-www-form-urlencoded"),
        }
    }

    /// Encode the body and set its content type unless one is already present.
    pub fn encode(&self, headers: &mut HashMap<String, String>) -> Bytes {
        if let Some(content_type) = self.content_type() {
            if get_header(headers, "Content-Type").is_none() {
                set_header(headers, "Content-Type", content_type);
            }
        }
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Bytes(bytes) => bytes.clone(),
            RequestBody::Text(text) => Bytes::from(text.clone()),
            RequestBody::Json(value) => Bytes::from(value.to_string()),
            RequestBody::Form(pairs) => Bytes::from(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish(),
            ),
        }
    }
}

/// Everything a caller can set on a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HashMap<String, String>,
    pub params: Vec<(String, String)>,
    pub cookies: HashMap<String, String>,
    pub body: RequestBody,
    pub timeout: Option<TimeoutOverride>,
    pub retry: Option<RetryPolicy>,
    pub allow_redirects: Option<bool>,
    pub auth: Option<Credential>,
    pub proxy: Option<ProxyConfig>,
    pub tls: Option<TlsConfig>,
    /// Set when `json()` could not serialize its value; fails the request.
    pub(crate) body_error: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, &name.into(), value);
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn body(mut self, bytes: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(bytes.into());
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = RequestBody::Text(text.into());
        self
    }

    /// JSON body from any serializable value. A value that fails to
    /// serialize makes the request fail with `ClientError::Encode`.
    #[must_use]
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.body = RequestBody::Json(value);
                self.body_error = None;
            }
            Err(e) => {
                self.body = RequestBody::Empty;
                self.body_error = Some(e.to_string());
            }
        }
        self
    }

    #[must_use]
    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Seconds (`f64`), a `Duration`, or a full `TimeoutPolicy`.
    #[must_use]
    pub fn timeout(mut self, timeout: impl Into<TimeoutOverride>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    #[must_use]
    pub fn redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = Some(allow);
        self
    }

    #[must_use]
    pub fn auth(mut self, auth: Credential) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    #[must_use]
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }
}

/// Render cookies as a `Cookie` header value: `a=1; b=2`.
pub fn cookie_header(cookies: &HashMap<String, String>) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    let mut pairs: Vec<_> = cookies.iter().collect();
    pairs.sort();
    Some(
        pairs
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
