//! HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → request.rs (RequestOptions: headers, params, cookies, body, overrides)
//!     → client.rs (merge, auth, hooks, retry loop, deadline per attempt)
//!     → net::transport (Connection::send)
//!     → response.rs (status snapshot, cached body, text/json/chunks)
//!     → stream.rs (unread body + upload buffer, single attempt)
//!     → hooks.rs (request and response observers, best effort)
//! ```

pub mod client;
pub mod hooks;
pub mod request;
pub mod response;
pub mod stream;

pub use client::Client;
pub use hooks::{FnHook, Hook, HookError, HookEvent, HookKind, Hooks, RequestContext};
pub use request::{Method, RequestBody, RequestOptions};
pub use response::Response;
pub use stream::StreamResponse;
