//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Session::get/post/... (url, options)
//!     → Session::request
//!     → router.resolve(absolute url)      longest-prefix adapter + its semaphore
//!     → acquire adapter permit            waits while `limit` requests are in flight
//!     → Client::execute(adapter, options)
//!     → Option<Response>
//! ```
//!
//! # Design Decisions
//! - Composition: a Session owns a Client and an AdapterRouter
//! - `http://` and `https://` are always mounted with default adapters
//! - Mutation (mount, headers, cookies) takes `&mut self`; traffic takes `&self`

pub mod merge;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;

use crate::config::loader::ConfigError;
use crate::config::schema::ClientConfig;
use crate::config::validation::ValidationError;
use crate::error::ClientError;
use crate::http::client::{swallow_failure, Client};
use crate::http::hooks::Hooks;
use crate::http::request::{Method, RequestOptions};
use crate::http::response::Response;
use crate::http::stream::StreamResponse;
use crate::net::transport::Transport;
use crate::observability::events::EventSink;
use crate::routing::adapter::AdapterConfig;
use crate::routing::router::{AdapterRoute, AdapterRouter};

pub use merge::{ClientDefaults, EffectiveConfig, PersistentState};

const DEFAULT_PREFIXES: [&str; 2] = ["http://", "https://"];

/// A client with persistent headers and cookies and per-prefix adapters.
pub struct Session {
    client: Client,
    router: AdapterRouter,
}

impl Session {
    /// Build a session. Default adapters are mounted first, then the
    /// adapters listed in `config`, in order.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let mounts = config.adapters.clone();
        let client = Client::new(config)?;

        let mut router = AdapterRouter::new();
        let defaults = DEFAULT_PREFIXES
            .iter()
            .map(|prefix| (prefix.to_string(), AdapterConfig::default()));
        let configured = mounts.into_iter().map(|m| (m.prefix, m.adapter));
        for (prefix, adapter) in defaults.chain(configured) {
            router
                .mount(prefix, adapter)
                .map_err(|e| ConfigError::Validation(vec![e]))?;
        }

        Ok(Self { client, router })
    }

    #[must_use]
    pub fn with_transport<T: Transport + 'static>(mut self, transport: Arc<T>) -> Self {
        self.client = self.client.with_transport(transport);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.client = self.client.with_hooks(hooks);
        self
    }

    #[must_use]
    pub fn with_events<E: EventSink + 'static>(mut self, events: Arc<E>) -> Self {
        self.client = self.client.with_events(events);
        self
    }

    pub async fn open(&mut self) -> Result<(), ClientError> {
        self.client.open().await
    }

    /// Close the transport and forget adapters and persistent headers.
    pub async fn close(&mut self) {
        self.client.close().await;
        self.router.clear();
        self.client.persistent_mut().headers.clear();
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Mount an adapter at a URL prefix. Re-mounting a prefix replaces it.
    pub fn mount(&mut self, prefix: impl Into<String>, adapter: AdapterConfig) -> Result<(), ValidationError> {
        let prefix = prefix.into();
        tracing::debug!(prefix = %prefix, pool = adapter.pool, limit = adapter.limit, "Mounting adapter");
        self.router.mount(prefix, adapter)
    }

    /// The adapter that applies to `url` (relative paths resolved against the endpoint).
    pub fn adapter(&self, url: &str) -> Result<&AdapterConfig, ClientError> {
        Ok(self.route(url)?.1.config)
    }

    /// The configuration a request to `url` with `options` would run with.
    pub fn merge(&self, url: &str, options: &RequestOptions) -> Result<EffectiveConfig, ClientError> {
        let (_, route) = self.route(url)?;
        Ok(merge::resolve(
            self.client.defaults(),
            self.client.persistent(),
            route.config,
            options,
        ))
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.client.persistent().headers
    }

    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.client.persistent_mut().headers
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.client.persistent().cookies
    }

    pub fn cookies_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.client.persistent_mut().cookies
    }

    fn route(&self, url: &str) -> Result<(String, AdapterRoute<'_>), ClientError> {
        let absolute = self.client.endpoint().resolve(url)?;
        let route = self.router.resolve(absolute.as_str());
        Ok((absolute.into(), route))
    }

    async fn permit(route: &AdapterRoute<'_>) -> Option<OwnedSemaphorePermit> {
        match route.permits {
            Some(permits) => permits.clone().acquire_owned().await.ok(),
            None => None,
        }
    }

    /// Run a request. `Ok(None)` means it failed after retries.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<Response>, ClientError> {
        swallow_failure(self.try_request(method, url, options).await)
    }

    /// Like [`request`](Session::request) but returns the terminal failure.
    pub async fn try_request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let (absolute, route) = self.route(url)?;
        let _permit = Self::permit(&route).await;
        self.client.execute(method, &absolute, route.config, options).await
    }

    /// Single attempt with the body left unread. Holds the adapter permit
    /// until the returned stream is dropped.
    pub async fn stream(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<StreamResponse, ClientError> {
        let (absolute, route) = self.route(url)?;
        let permit = Self::permit(&route).await;
        let response = self.client.open_stream(method, &absolute, route.config, options).await?;
        Ok(StreamResponse::new(response, permit))
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Option<Response>, ClientError> {
        self.request(Method::GET, url, options).await
    }

    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<Option<Response>, ClientError> {
        self.request(Method::POST, url, options).await
    }

    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<Option<Response>, ClientError> {
        self.request(Method::PUT, url, options).await
    }

    pub async fn patch(&self, url: &str, options: RequestOptions) -> Result<Option<Response>, ClientError> {
        self.request(Method::PATCH, url, options).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<Option<Response>, ClientError> {
        self.request(Method::DELETE, url, options).await
    }

    pub async fn head(&self, url: &str, options: RequestOptions) -> Result<Option<Response>, ClientError> {
        self.request(Method::HEAD, url, options).await
    }

    pub async fn options(&self, url: &str, options: RequestOptions) -> Result<Option<Response>, ClientError> {
        self.request(Method::OPTIONS, url, options).await
    }
}
