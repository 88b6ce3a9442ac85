//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator (per request, tagged with a UUID v4 request id):
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms via the metrics facade)
//!     → events.rs  (RetryScheduled / RequestFailed / HookFailed → EventSink)
//!
//! Consumers:
//!     → Any tracing subscriber (the CLI installs fmt + EnvFilter)
//!     → Any metrics recorder installed by the application
//!     → Custom EventSink (tests use MemorySink)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line and event
//! - Metrics are cheap (no-op without a recorder)
//! - Swallowed failures are always reported as events

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{ClientEvent, EventSink, MemorySink, TracingSink};
