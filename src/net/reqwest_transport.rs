//! Production transport built on `reqwest`.
//!
//! # Responsibilities
//! - Build and cache one `reqwest::Client` per distinct proxy/TLS/redirect/pool setting
//! - Send requests and expose the body as a chunk stream
//! - Map reqwest failures onto [`TransportError`] categories
//!
//! # Design Decisions
//! - Clients are cached in a `DashMap`; building one is expensive, cloning is cheap
//! - Timeouts never enter the cache key. They are applied per request: `total`
//!   through reqwest, `connect + read` as the wait for response headers and
//!   `read` as the longest gap between body chunks
//! - `Limits::connections` caps open exchanges: the permit travels with the
//!   body stream and is released once the body is finished or dropped
//! - Proxy headers are attached to the `reqwest::Proxy`, so only the proxy hop sees them
//! - Without a proxy, `no_proxy()` keeps environment proxies out
//! - `reason` is the canonical phrase for the status code; reqwest does not
//!   expose the server's own status line, so non-standard codes get an empty reason

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use tokio::sync::Semaphore;

use crate::config::schema::Limits;
use crate::net::endpoint::Endpoint;
use crate::net::tls::TlsConfig;
use crate::net::transport::{
    BodyStream, Connection, Transport, TransportError, TransportRequest, TransportResponse,
};

/// Opens [`ReqwestConnection`]s.
#[derive(Debug, Default, Clone)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, endpoint: &Endpoint, limits: &Limits) -> Result<Arc<dyn Connection>, TransportError> {
        tracing::debug!(
            endpoint = %endpoint,
            connections = limits.connections,
            keepalive = limits.keepalive,
            "Opening reqwest connection pool"
        );
        Ok(Arc::new(ReqwestConnection::new(limits.clone())))
    }
}

/// Settings that require a distinct `reqwest::Client`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    proxy_url: Option<String>,
    /// Sorted by name so equal maps produce equal keys.
    proxy_headers: Vec<(String, String)>,
    tls: TlsConfig,
    redirects: Option<u32>,
    pool_idle: usize,
}

impl ClientKey {
    fn for_request(request: &TransportRequest, limits: &Limits) -> Self {
        let mut proxy_headers: Vec<_> = request
            .proxy_headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        proxy_headers.sort();
        Self {
            proxy_url: request.proxy_url.clone(),
            proxy_headers,
            tls: request.tls.clone(),
            redirects: request.allow_redirects.then_some(request.max_redirects),
            pool_idle: request.pool_idle.unwrap_or(limits.keepalive),
        }
    }
}

pub struct ReqwestConnection {
    limits: Limits,
    clients: DashMap<ClientKey, reqwest::Client>,
    in_flight: Arc<Semaphore>,
}

impl ReqwestConnection {
    pub fn new(limits: Limits) -> Self {
        let in_flight = Arc::new(Semaphore::new(limits.connections.max(1)));
        Self {
            limits,
            clients: DashMap::new(),
            in_flight,
        }
    }

    /// Number of cached clients.
    pub fn cached_clients(&self) -> usize {
        self.clients.len()
    }

    /// Exchanges whose body has not been finished or dropped yet.
    pub fn open_exchanges(&self) -> usize {
        self.limits.connections.max(1) - self.in_flight.available_permits()
    }

    async fn client_for(&self, key: &ClientKey) -> Result<reqwest::Client, TransportError> {
        if let Some(client) = self.clients.get(key) {
            return Ok(client.value().clone());
        }
        let client = build_client(key, &self.limits).await?;
        Ok(self.clients.entry(key.clone()).or_insert(client).value().clone())
    }
}

async fn build_client(key: &ClientKey, limits: &Limits) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(key.pool_idle.min(limits.per_host))
        .redirect(match key.redirects {
            Some(limit) => Policy::limited(limit as usize),
            None => Policy::none(),
        });

    builder = match &key.proxy_url {
        Some(url) => {
            let mut proxy = reqwest::Proxy::all(url).map_err(|e| TransportError::Proxy(e.to_string()))?;
            if !key.proxy_headers.is_empty() {
                proxy = proxy.headers(header_map(key.proxy_headers.iter().cloned())?);
            }
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };

    if !key.tls.verify {
        builder = builder.danger_accept_invalid_certs(true);
    }
    if key.tls.ciphers.is_some() {
        tracing::warn!("Cipher restrictions are not supported by the reqwest transport; ignoring");
    }
    if !key.tls.is_plain() {
        let materials = key.tls.load_materials().await?;
        if let Some(pem) = materials.ca_bundle {
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| TransportError::Tls(e.to_string()))?;
            builder = builder.add_root_certificate(cert);
        }
        if let Some((cert, key)) = materials.identity {
            let identity =
                reqwest::Identity::from_pkcs8_pem(&cert, &key).map_err(|e| TransportError::Tls(e.to_string()))?;
            builder = builder.identity(identity);
        }
    }

    builder.build().map_err(|e| TransportError::Tls(e.to_string()))
}

fn header_map<I>(headers: I) -> Result<HeaderMap, TransportError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Request(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|e| TransportError::Request(format!("invalid value for header '{name}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn map_error(error: reqwest::Error, proxied: bool) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        if proxied {
            TransportError::Proxy(error.to_string())
        } else {
            TransportError::Connect(error.to_string())
        }
    } else if error.is_body() || error.is_decode() {
        TransportError::Body(error.to_string())
    } else if error.is_redirect() {
        TransportError::Status {
            status: error.status().map_or(0, |s| s.as_u16()),
            message: error.to_string(),
        }
    } else {
        TransportError::Request(error.to_string())
    }
}

#[async_trait]
impl Connection for ReqwestConnection {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let key = ClientKey::for_request(&request, &self.limits);
        let client = self.client_for(&key).await?;
        let proxied = request.proxy_url.is_some();
        let headers_within = request
            .timeout
            .connect_duration()
            .saturating_add(request.timeout.read_duration());
        let read = request.timeout.read_duration();

        let permit = self
            .in_flight
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TransportError::Connect("connection pool closed".into()))?;

        let mut builder = client
            .request(request.method, &request.url)
            .headers(header_map(request.headers)?)
            .timeout(request.timeout.total_duration());
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = match tokio::time::timeout(headers_within, builder.send()).await {
            Ok(sent) => sent.map_err(|e| map_error(e, proxied))?,
            Err(_) => {
                return Err(TransportError::Timeout(format!(
                    "no response headers within {headers_within:?}"
                )))
            }
        };

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let url = response.url().to_string();

        // The permit rides along with the body and is released when it is dropped.
        let chunks = Box::pin(response.bytes_stream());
        let body = stream::unfold((chunks, permit), move |(mut chunks, permit)| async move {
            let item = match tokio::time::timeout(read, chunks.next()).await {
                Ok(Some(chunk)) => chunk.map_err(|e| map_error(e, proxied)),
                Ok(None) => return None,
                Err(_) => Err(TransportError::Timeout(format!("no body data within {read:?}"))),
            };
            Some((item, (chunks, permit)))
        });

        Ok(TransportResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            url,
            body: BodyStream::new(body),
        })
    }

    async fn close(&self) {
        tracing::debug!(clients = self.clients.len(), "Closing reqwest connection pool");
        self.clients.clear();
        self.in_flight.close();
    }
}
