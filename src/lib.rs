//! Resilient asynchronous HTTP client core.
//!
//! # Architecture Overview
//!
//! ```text
//!     Session::get/post/...            ┌──────────────────────────────────────────────┐
//!     ─────────────────────────────────┼─▶ routing (adapter by longest URL prefix)    │
//!                                      │        │                                     │
//!                                      │        ▼                                     │
//!                                      │  session::merge (request > adapter > default)│
//!                                      │        │                                     │
//!                                      │        ▼                                     │
//!                                      │  http::client ── auth ── hooks               │
//!                                      │        │                                     │
//!                                      │        ▼                                     │
//!                                      │  resilience (deadline, retry, backoff)       │
//!                                      │        │                                     │
//!                                      │        ▼                                     │
//!     Option<Response>                 │  net::transport ──▶ reqwest ─────────────────┼──▶ Server
//!     ◀────────────────────────────────┼─ http::response (cached body, text, json)    │
//!                                      │                                              │
//!                                      │  Cross-cutting: config, observability, error │
//!                                      └──────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod session;

pub use auth::Credential;
pub use config::{load_config, ClientConfig};
pub use error::{ClientError, ClientResult};
pub use http::{Client, Method, RequestOptions, Response, StreamResponse};
pub use session::Session;
