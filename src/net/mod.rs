//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ClientConfig.endpoint
//!     → endpoint.rs (scheme check, relative URL resolution)
//!     → Transport::open(endpoint, limits) → Arc<dyn Connection>
//!
//! Per attempt:
//!     proxy.rs (validate, render http://[user:pass@]host:port)
//!     tls.rs   (pairing check, PEM loading)
//!     → TransportRequest → Connection::send → TransportResponse { body: BodyStream }
//! ```
//!
//! # Design Decisions
//! - Transport is a trait; reqwest is the default, tests inject their own
//! - TLS is delegated to the transport; this layer only carries settings
//! - Errors are categorized once, at the transport boundary

pub mod endpoint;
pub mod proxy;
pub mod reqwest_transport;
pub mod tls;
pub mod transport;

pub use endpoint::Endpoint;
pub use proxy::ProxyConfig;
pub use reqwest_transport::ReqwestTransport;
pub use tls::TlsConfig;
pub use transport::{BodyStream, Connection, Transport, TransportError, TransportRequest, TransportResponse};
