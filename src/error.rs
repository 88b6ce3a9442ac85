//! Crate-level error type.
//!
//! # Taxonomy
//! ```text
//! Config          invalid endpoint, proxy, TLS pairing, value objects  → always returned
//! NotInitialized  request issued before open()                          → always returned
//! Encode          request body failed to serialize                      → always returned
//! Transport       connect / timeout / proxy / body failures              → retried, then surfaced
//! Status          non-2xx status after retries                           → retried if retryable
//! Decode          malformed JSON body                                    → raised by json()
//! ```
//! Hook failures never reach this type; they are demoted to events.

use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::net::transport::TransportError;

/// Errors surfaced by the client, session and response accessors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration rejected before any transport attempt.
    #[error("configuration error: {0}")]
    Config(#[from] ValidationError),

    /// The client was used before `open()` or after `close()`.
    #[error("client is not initialized: call open() before issuing requests")]
    NotInitialized,

    /// Transport failure that outlived the retry budget.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Error status that outlived the retry budget, or any error status on a stream.
    #[error("HTTP {status} {reason}")]
    Status { status: u16, reason: String },

    /// The request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(String),

    /// Response body is not valid JSON.
    #[error("failed to parse JSON body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The body can no longer be read and nothing was cached.
    #[error("response body unavailable: {0}")]
    BodyUnavailable(String),
}

impl ClientError {
    /// True for errors that `request()` must always raise.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ClientError::Config(_) | ClientError::NotInitialized | ClientError::Encode(_)
        )
    }
}

/// Result type used across the crate.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Status {
            status: 503,
            reason: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "HTTP 503 Service Unavailable");

        let err = ClientError::from(TransportError::Timeout("total deadline of 2s".into()));
        assert!(err.to_string().contains("total deadline"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_errors() {
        assert!(ClientError::NotInitialized.is_configuration());
        let err = ClientError::from(ValidationError::Proxy("port must be between 1 and 65535".into()));
        assert!(err.is_configuration());
        assert!(err.to_string().starts_with("configuration error"));
    }
}
