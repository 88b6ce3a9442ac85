//! Streaming responses.

use std::ops::Deref;

use bytes::{Bytes, BytesMut};
use tokio::sync::OwnedSemaphorePermit;

use crate::http::response::Response;

/// A response returned before its body was read, with an upload buffer.
///
/// Holds the adapter's concurrency permit until dropped. Not retried.
#[derive(Debug)]
pub struct StreamResponse {
    response: Response,
    upload: BytesMut,
    _permit: Option<OwnedSemaphorePermit>,
}

impl StreamResponse {
    pub(crate) fn new(response: Response, permit: Option<OwnedSemaphorePermit>) -> Self {
        Self {
            response,
            upload: BytesMut::new(),
            _permit: permit,
        }
    }

    /// Append bytes to the upload buffer.
    pub fn write(&mut self, data: impl AsRef<[u8]>) {
        self.upload.extend_from_slice(data.as_ref());
    }

    pub fn pending_upload(&self) -> usize {
        self.upload.len()
    }

    /// Take everything written so far, leaving the buffer empty.
    pub fn take_upload(&mut self) -> Bytes {
        self.upload.split().freeze()
    }

    /// Drop the stream wrapper, releasing the permit.
    pub fn into_response(self) -> Response {
        self.response
    }
}

impl Deref for StreamResponse {
    type Target = Response;

    fn deref(&self) -> &Response {
        &self.response
    }
}
