//! Client lifecycle events.
//!
//! Failures that `request()` swallows still have to be visible somewhere.
//! The orchestrator reports them as [`ClientEvent`]s through an injected
//! [`EventSink`]; the default sink logs them.

use std::sync::Mutex;
use std::time::Duration;

use uuid::Uuid;

use crate::http::hooks::HookKind;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A retry was scheduled after attempt `attempt` failed.
    RetryScheduled {
        request_id: Uuid,
        attempt: u32,
        delay: Duration,
        cause: String,
    },
    /// A request ended without a usable response.
    RequestFailed {
        request_id: Uuid,
        method: String,
        url: String,
        failure: String,
        /// True when the retry budget ran out.
        exhausted: bool,
    },
    /// A hook returned an error; the request carried on.
    HookFailed {
        request_id: Uuid,
        kind: HookKind,
        error: String,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ClientEvent);
}

/// Logs every event with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &ClientEvent) {
        match event {
            ClientEvent::RetryScheduled {
                request_id,
                attempt,
                delay,
                cause,
            } => {
                tracing::info!(
                    request_id = %request_id,
                    attempt,
                    delay = ?delay,
                    cause = %cause,
                    "Retrying request"
                );
            }
            ClientEvent::RequestFailed {
                request_id,
                method,
                url,
                failure,
                exhausted,
            } => {
                tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    url = %url,
                    exhausted,
                    error = %failure,
                    "Request failed"
                );
            }
            ClientEvent::HookFailed {
                request_id,
                kind,
                error,
            } => {
                tracing::warn!(
                    request_id = %request_id,
                    hook = %kind,
                    error = %error,
                    "Hook failed; continuing"
                );
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ClientEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<ClientEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn retry_delays(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ClientEvent::RetryScheduled { delay, .. } => Some(delay),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &ClientEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
