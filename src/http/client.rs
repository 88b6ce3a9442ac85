//! Request orchestration.
//!
//! # Responsibilities
//! - Resolve the target URL against the endpoint
//! - Merge configuration and apply auth, cookies and the body
//! - Run the retry loop with a deadline per attempt
//! - Cache the body of successful responses before returning them
//! - Report swallowed failures through the event sink
//!
//! # Request Lifecycle
//! ```text
//! request(method, url, options)
//!     → open? else NotInitialized
//!     → endpoint.resolve(url)             relative paths appended to the endpoint
//!     → merge::resolve                    request > adapter > defaults
//!     → auth.apply, cookies, body         headers/params finalized
//!     → request hook                      errors become HookFailed events
//!     → loop attempt n:
//!           proxy.validate                invalid → Config error, no transport call
//!           timeout(total, send + drain)
//!           RetryPolicy decides           Retry(delay) → sleep → n+1
//!     → response hook
//!     → Some(Response) | None + RequestFailed event
//! ```

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use url::Url;
use uuid::Uuid;

use crate::config::loader::ConfigError;
use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::error::ClientError;
use crate::http::hooks::{HookEvent, Hooks, RequestContext};
use crate::http::request::{cookie_header, Method, RequestOptions};
use crate::http::response::Response;
use crate::http::stream::StreamResponse;
use crate::net::endpoint::Endpoint;
use crate::net::reqwest_transport::ReqwestTransport;
use crate::net::transport::{Connection, Transport, TransportError, TransportRequest};
use crate::observability::events::{ClientEvent, EventSink, TracingSink};
use crate::observability::metrics;
use crate::resilience::retries::{RetryDecision, RetryPolicy};
use crate::routing::adapter::AdapterConfig;
use crate::session::merge::{self, get_header, set_header, ClientDefaults, EffectiveConfig, PersistentState};

/// A request with everything resolved except the proxy URL.
struct Prepared {
    request_id: Uuid,
    method: Method,
    url: Url,
    effective: EffectiveConfig,
    params: Vec<(String, String)>,
    body: Bytes,
}

/// Executes requests against one endpoint.
///
/// Built from a [`ClientConfig`]; must be [`open`](Client::open)ed before use.
/// Adapters listed in the config are mounted by [`Session`](crate::session::Session),
/// not by the client.
pub struct Client {
    endpoint: Endpoint,
    defaults: ClientDefaults,
    persistent: PersistentState,
    hooks: Hooks,
    events: Arc<dyn EventSink>,
    transport: Arc<dyn Transport>,
    connection: Option<Arc<dyn Connection>>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let endpoint = Endpoint::parse(&config.endpoint).map_err(|e| ConfigError::Validation(vec![e]))?;

        Ok(Self {
            endpoint,
            defaults: ClientDefaults::from_config(&config),
            persistent: PersistentState::from_config(&config),
            hooks: Hooks::default(),
            events: Arc::new(TracingSink),
            transport: Arc::new(ReqwestTransport::new()),
            connection: None,
        })
    }

    #[must_use]
    pub fn with_transport<T: Transport + 'static>(mut self, transport: Arc<T>) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_events<E: EventSink + 'static>(mut self, events: Arc<E>) -> Self {
        self.events = events;
        self
    }

    /// Open the transport. Calling it on an open client does nothing.
    pub async fn open(&mut self) -> Result<(), ClientError> {
        if self.connection.is_some() {
            return Ok(());
        }
        let connection = self.transport.open(&self.endpoint, &self.defaults.limits).await?;
        tracing::debug!(endpoint = %self.endpoint, "Client opened");
        self.connection = Some(connection);
        Ok(())
    }

    /// Close the transport. Later requests fail with `NotInitialized`.
    pub async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
            tracing::debug!(endpoint = %self.endpoint, "Client closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    pub fn persistent(&self) -> &PersistentState {
        &self.persistent
    }

    pub(crate) fn persistent_mut(&mut self) -> &mut PersistentState {
        &mut self.persistent
    }

    /// Run a request through the retry loop.
    ///
    /// Returns `Ok(None)` when the request failed after retries; the failure is
    /// reported as a `RequestFailed` event. Configuration errors are returned.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<Response>, ClientError> {
        swallow_failure(self.execute(method, url, &AdapterConfig::default(), options).await)
    }

    /// Like [`request`](Client::request) but returns the terminal failure.
    pub async fn try_request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        self.execute(method, url, &AdapterConfig::default(), options).await
    }

    /// Single attempt, body left unread. Errors and statuses ≥ 400 are returned.
    pub async fn stream(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<StreamResponse, ClientError> {
        let response = self.open_stream(method, url, &AdapterConfig::default(), options).await?;
        Ok(StreamResponse::new(response, None))
    }

    fn connection(&self) -> Result<&Arc<dyn Connection>, ClientError> {
        self.connection.as_ref().ok_or(ClientError::NotInitialized)
    }

    fn prepare(
        &self,
        method: Method,
        url: &str,
        adapter: &AdapterConfig,
        options: RequestOptions,
    ) -> Result<Prepared, ClientError> {
        let url = self.endpoint.resolve(url)?;
        validate_overrides(&options)?;
        if let Some(error) = &options.body_error {
            return Err(ClientError::Encode(error.clone()));
        }

        let mut effective = merge::resolve(&self.defaults, &self.persistent, adapter, &options);
        effective.tls.validate()?;

        let mut params = options.params;
        if let Some(auth) = effective.auth.clone() {
            auth.apply(&mut effective.headers, &mut params);
        }
        if let Some(cookies) = cookie_header(&effective.cookies) {
            let value = match get_header(&effective.headers, "Cookie") {
                Some(existing) => format!("{existing}; {cookies}"),
                None => cookies,
            };
            set_header(&mut effective.headers, "Cookie", value);
        }
        let body = options.body.encode(&mut effective.headers);

        Ok(Prepared {
            request_id: Uuid::new_v4(),
            method,
            url,
            effective,
            params,
            body,
        })
    }

    fn transport_request(&self, prepared: &Prepared) -> Result<TransportRequest, ClientError> {
        let effective = &prepared.effective;
        let (proxy_url, proxy_headers) = match &effective.proxy {
            Some(proxy) => {
                proxy.validate()?;
                (Some(proxy.url()), proxy.headers.clone())
            }
            None => (None, Default::default()),
        };

        Ok(TransportRequest {
            method: prepared.method.clone(),
            url: prepared.url.to_string(),
            headers: effective.headers.clone(),
            params: prepared.params.clone(),
            body: prepared.body.clone(),
            timeout: effective.timeout,
            proxy_url,
            proxy_headers,
            tls: effective.tls.clone(),
            max_redirects: effective.redirects.limit,
            allow_redirects: effective.allow_redirects,
            pool_idle: Some(effective.pool),
        })
    }

    async fn fire_hook(&self, request_id: Uuid, event: &HookEvent<'_>) {
        if let Err(error) = self.hooks.fire(event).await {
            self.events.emit(&ClientEvent::HookFailed {
                request_id,
                kind: event.kind(),
                error: error.to_string(),
            });
        }
    }

    pub(crate) async fn execute(
        &self,
        method: Method,
        url: &str,
        adapter: &AdapterConfig,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let connection = self.connection()?;
        let prepared = self.prepare(method, url, adapter, options)?;
        let request_id = prepared.request_id;
        let policy = &prepared.effective.retry;

        self.fire_hook(
            request_id,
            &HookEvent::Request(RequestContext {
                request_id,
                method: &prepared.method,
                url: prepared.url.as_str(),
                config: &prepared.effective,
            }),
        )
        .await;

        let started = Instant::now();
        let mut attempt = 0;
        loop {
            let request = self.transport_request(&prepared)?;
            tracing::debug!(
                request_id = %request_id,
                method = %prepared.method,
                url = %prepared.url,
                attempt,
                "Sending request"
            );

            let (decision, failure) = match send_attempt(&**connection, request, policy, attempt, request_id).await {
                Ok((response, decision)) => {
                    metrics::record_request(prepared.method.as_str(), response.status(), started);
                    if decision == RetryDecision::Succeed {
                        self.fire_hook(request_id, &HookEvent::Response(&response)).await;
                        return Ok(response);
                    }
                    let failure = ClientError::Status {
                        status: response.status(),
                        reason: response.reason().to_string(),
                    };
                    (decision, failure)
                }
                Err(error) => (policy.on_error(attempt, &error), ClientError::Transport(error)),
            };

            let delay = match decision {
                RetryDecision::Retry(delay) => delay,
                terminal => {
                    metrics::record_failure(failure_kind(&failure));
                    self.events.emit(&ClientEvent::RequestFailed {
                        request_id,
                        method: prepared.method.to_string(),
                        url: prepared.url.to_string(),
                        failure: failure.to_string(),
                        exhausted: terminal == RetryDecision::Exhausted,
                    });
                    return Err(failure);
                }
            };

            metrics::record_retry(failure_kind(&failure));
            self.events.emit(&ClientEvent::RetryScheduled {
                request_id,
                attempt,
                delay,
                cause: failure.to_string(),
            });
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    pub(crate) async fn open_stream(
        &self,
        method: Method,
        url: &str,
        adapter: &AdapterConfig,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let connection = self.connection()?;
        let prepared = self.prepare(method, url, adapter, options)?;
        let request_id = prepared.request_id;

        self.fire_hook(
            request_id,
            &HookEvent::Request(RequestContext {
                request_id,
                method: &prepared.method,
                url: prepared.url.as_str(),
                config: &prepared.effective,
            }),
        )
        .await;

        let request = self.transport_request(&prepared)?;
        let deadline = request.timeout.total_duration();
        let started = Instant::now();
        tracing::debug!(request_id = %request_id, url = %prepared.url, "Opening stream");

        let sent = match tokio::time::timeout(deadline, connection.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(format!("no response headers within {deadline:?}"))),
        };
        let response = match sent {
            Ok(response) => Response::from_transport(response, request_id),
            Err(error) => {
                metrics::record_failure(error.kind());
                return Err(error.into());
            }
        };

        metrics::record_request(prepared.method.as_str(), response.status(), started);
        if response.status() >= 400 {
            metrics::record_failure("status");
            return Err(ClientError::Status {
                status: response.status(),
                reason: response.reason().to_string(),
            });
        }
        self.fire_hook(request_id, &HookEvent::Response(&response)).await;
        Ok(response)
    }
}

/// One transport call, bounded by the total deadline. The body is drained
/// inside the deadline when the status means success.
async fn send_attempt(
    connection: &dyn Connection,
    request: TransportRequest,
    policy: &RetryPolicy,
    attempt: u32,
    request_id: Uuid,
) -> Result<(Response, RetryDecision), TransportError> {
    let deadline = request.timeout.total_duration();
    let work = async {
        let response = Response::from_transport(connection.send(request).await?, request_id);
        let decision = policy.on_status(attempt, response.status());
        if decision == RetryDecision::Succeed {
            response.drain().await?;
        }
        Ok((response, decision))
    };
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(format!(
            "no complete response within {deadline:?}"
        ))),
    }
}

fn validate_overrides(options: &RequestOptions) -> Result<(), ValidationError> {
    if let Some(retry) = &options.retry {
        retry.validate()?;
    }
    if let Some(timeout) = options.timeout {
        timeout.resolve().validate()?;
    }
    if let Some(auth) = &options.auth {
        auth.validate()?;
    }
    Ok(())
}

fn failure_kind(error: &ClientError) -> &'static str {
    match error {
        ClientError::Transport(e) => e.kind(),
        ClientError::Status { .. } => "status",
        _ => "other",
    }
}

/// Turn a terminal transport or status failure into `Ok(None)`.
pub(crate) fn swallow_failure(result: Result<Response, ClientError>) -> Result<Option<Response>, ClientError> {
    match result {
        Ok(response) => Ok(Some(response)),
        Err(error) if error.is_configuration() => Err(error),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let err = Client::new(ClientConfig::new("ftp://example.com")).err().unwrap();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[tokio::test]
    async fn test_request_before_open() {
        let client = Client::new(ClientConfig::default()).unwrap();
        assert!(!client.is_open());
        let err = client
            .request(Method::GET, "/", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotInitialized));
    }

    #[test]
    fn test_swallow_failure() {
        let status = Err(ClientError::Status {
            status: 500,
            reason: "Internal Server Error".into(),
        });
        assert!(swallow_failure(status).unwrap().is_none());

        let config = Err(ClientError::Config(ValidationError::Proxy("bad".into())));
        assert!(swallow_failure(config).is_err());
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let options = RequestOptions::new().timeout(-1.0);
        assert!(matches!(validate_overrides(&options), Err(ValidationError::Timeout(_))));
    }
}
