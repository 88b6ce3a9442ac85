//! Response wrapper with a lazily filled body cache.
//!
//! # Responsibilities
//! - Snapshot status, reason, URL and headers at receipt
//! - Read the body at most once and serve later reads from the cache
//! - Decode text by the `Content-Type` charset (`encoding_rs`) and JSON from that text
//! - Stream the body in fixed-size chunks while filling the cache
//!
//! # Design Decisions
//! - Reads go through one async mutex; the transport stream is pulled by one reader at a time
//! - A body that fails part way keeps what was read (`cached_bytes()`)
//! - Text and JSON are computed once and borrowed afterwards

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use futures_util::stream::{self, BoxStream, StreamExt};
use mime::Mime;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ClientError;
use crate::net::transport::{BodyStream, TransportError, TransportResponse};

#[derive(Debug, Default)]
struct BodyState {
    /// Transport stream; `None` once exhausted or failed.
    source: Option<BodyStream>,
    buffer: BytesMut,
    complete: Option<Bytes>,
    failure: Option<TransportError>,
}

impl BodyState {
    fn len(&self) -> usize {
        self.complete.as_ref().map_or(self.buffer.len(), Bytes::len)
    }

    fn slice(&self, start: usize, end: usize) -> Bytes {
        match &self.complete {
            Some(bytes) => bytes.slice(start..end),
            None => Bytes::copy_from_slice(&self.buffer[start..end]),
        }
    }

    /// Pull one chunk. Returns false when the source is gone.
    async fn pull(&mut self) -> bool {
        let Some(source) = self.source.as_mut() else {
            return false;
        };
        match source.next().await {
            Some(Ok(chunk)) => {
                self.buffer.extend_from_slice(&chunk);
                true
            }
            Some(Err(error)) => {
                self.source = None;
                self.failure = Some(error);
                false
            }
            None => {
                self.source = None;
                self.complete = Some(self.buffer.split().freeze());
                false
            }
        }
    }

    async fn fill(&mut self) -> Result<Bytes, TransportError> {
        while self.pull().await {}
        if let Some(bytes) = &self.complete {
            return Ok(bytes.clone());
        }
        Err(self
            .failure
            .clone()
            .unwrap_or_else(|| TransportError::Body("body stream ended without completing".into())))
    }
}

/// An HTTP response whose body is read on demand and cached.
pub struct Response {
    status: u16,
    reason: String,
    url: String,
    headers: Vec<(String, String)>,
    request_id: Uuid,
    created: Instant,
    body: Mutex<BodyState>,
    text: OnceLock<String>,
    json: OnceLock<Value>,
}

impl Response {
    pub fn from_transport(response: TransportResponse, request_id: Uuid) -> Self {
        Self {
            status: response.status,
            reason: response.reason,
            url: response.url,
            headers: response.headers,
            request_id,
            created: Instant::now(),
            body: Mutex::new(BodyState {
                source: Some(response.body),
                ..BodyState::default()
            }),
            text: OnceLock::new(),
            json: OnceLock::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Final URL, after redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Cookies set by this response, name to value.
    pub fn cookies(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, value)| {
                let pair = value.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Time since the response was received.
    pub fn elapsed(&self) -> Duration {
        self.created.elapsed()
    }

    pub fn error_for_status(&self) -> Result<&Self, ClientError> {
        if self.status >= 400 {
            Err(ClientError::Status {
                status: self.status,
                reason: self.reason.clone(),
            })
        } else {
            Ok(self)
        }
    }

    /// The whole body. Reads the transport on first call only.
    pub async fn bytes(&self) -> Result<Bytes, ClientError> {
        let mut body = self.body.lock().await;
        Ok(body.fill().await?)
    }

    pub(crate) async fn drain(&self) -> Result<(), TransportError> {
        self.body.lock().await.fill().await.map(drop)
    }

    /// Whatever has been read so far, complete or not.
    pub async fn cached_bytes(&self) -> Bytes {
        let body = self.body.lock().await;
        body.slice(0, body.len())
    }

    /// The body decoded with the charset named in `Content-Type`.
    pub async fn text(&self) -> Result<&str, ClientError> {
        if let Some(text) = self.text.get() {
            return Ok(text);
        }
        let bytes = self.bytes().await?;
        let decoded = decode(&bytes, self.content_type());
        Ok(self.text.get_or_init(|| decoded))
    }

    pub async fn json(&self) -> Result<&Value, ClientError> {
        if let Some(value) = self.json.get() {
            return Ok(value);
        }
        let value: Value = serde_json::from_str(self.text().await?).map_err(ClientError::Decode)?;
        Ok(self.json.get_or_init(|| value))
    }

    /// Deserialize the body into `T`.
    pub async fn json_as<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ClientError::Decode)
    }

    /// Body in chunks of at most `size` bytes. Served from the cache when the
    /// body is complete; otherwise pulled from the transport into the cache.
    pub fn chunks(&self, size: usize) -> BoxStream<'_, Result<Bytes, ClientError>> {
        let state = ChunkCursor {
            response: self,
            offset: 0,
            size: size.max(1),
            finished: false,
        };
        stream::unfold(state, |mut cursor| async move {
            let item = cursor.advance().await?;
            Some((item, cursor))
        })
        .boxed()
    }
}

struct ChunkCursor<'a> {
    response: &'a Response,
    offset: usize,
    size: usize,
    finished: bool,
}

impl ChunkCursor<'_> {
    async fn advance(&mut self) -> Option<Result<Bytes, ClientError>> {
        if self.finished {
            return None;
        }
        let mut body = self.response.body.lock().await;
        let want = self.offset + self.size;
        while body.len() < want && body.pull().await {}

        let available = body.len();
        if available > self.offset {
            let end = available.min(want);
            let chunk = body.slice(self.offset, end);
            self.offset = end;
            return Some(Ok(chunk));
        }

        self.finished = true;
        if body.complete.is_some() {
            return None;
        }
        body.failure.clone().map(|error| Err(error.into()))
    }
}

/// Decode with the `charset` parameter of `Content-Type`. Unknown or
/// missing labels fall back to UTF-8; malformed sequences become U+FFFD.
fn decode(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(|value| value.parse::<Mime>().ok())
        .and_then(|mime| mime.get_param(mime::CHARSET).map(|charset| charset.to_string()))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("url", &self.url)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}
