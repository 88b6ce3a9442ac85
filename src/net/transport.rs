//! Transport abstraction.
//!
//! The orchestrator never touches sockets. It opens a [`Connection`] through a
//! [`Transport`] and hands it fully resolved [`TransportRequest`]s.
//!
//! # Implementations
//!
//! - [`ReqwestTransport`](crate::net::reqwest_transport::ReqwestTransport): production implementation
//! - Scripted transports in tests

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, Stream};
use reqwest::Method;
use thiserror::Error;

use crate::config::schema::Limits;
use crate::net::endpoint::Endpoint;
use crate::net::tls::TlsConfig;
use crate::resilience::timeouts::TimeoutPolicy;

/// Failures reported by a transport, by category.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("invalid request: {0}")]
    Request(String),
}

impl TransportError {
    /// Connection-class failures that the retry loop may repeat.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Connect(_)
                | TransportError::Timeout(_)
                | TransportError::Proxy(_)
                | TransportError::Body(_)
        )
    }

    /// Label used for metrics and events.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Connect(_) => "connect",
            TransportError::Timeout(_) => "timeout",
            TransportError::Proxy(_) => "proxy",
            TransportError::Status { .. } => "status",
            TransportError::Body(_) => "body",
            TransportError::Tls(_) => "tls",
            TransportError::Request(_) => "request",
        }
    }
}

/// A fully resolved request, ready for the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub params: Vec<(String, String)>,
    pub body: Bytes,
    pub timeout: TimeoutPolicy,
    /// `http://[user:pass@]host:port`, already validated.
    pub proxy_url: Option<String>,
    /// Sent to the proxy only, never to the origin.
    pub proxy_headers: HashMap<String, String>,
    pub tls: TlsConfig,
    pub max_redirects: u32,
    pub allow_redirects: bool,
    /// Idle connections to keep for this request's adapter.
    pub pool_idle: Option<usize>,
}

/// Status line, headers and a body that has not been read yet.
pub struct TransportResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    /// Final URL after redirects.
    pub url: String,
    pub body: BodyStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("url", &self.url)
            .field("headers", &self.headers.len())
            .finish_non_exhaustive()
    }
}

type InnerStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Response body chunks as they arrive.
///
/// The inner stream is only reached through `&mut self`, so the mutex is
/// never contended; it exists to make the body `Sync`.
pub struct BodyStream {
    inner: Mutex<InnerStream>,
}

impl BodyStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            inner: Mutex::new(Box::pin(stream)),
        }
    }

    pub fn empty() -> Self {
        Self::new(stream::empty())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::new(stream::iter([Ok(bytes.into())]))
    }
}

impl Stream for BodyStream {
    type Item = Result<Bytes, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().inner.get_mut() {
            Ok(inner) => inner.as_mut().poll_next(cx),
            Err(poisoned) => poisoned.into_inner().as_mut().poll_next(cx),
        }
    }
}

impl fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BodyStream")
    }
}

/// Factory for connections to an endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, endpoint: &Endpoint, limits: &Limits) -> Result<Arc<dyn Connection>, TransportError>;
}

/// An open connection pool able to send requests.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    async fn close(&self);
}
