//! Outbound message bodies.
//!
//! A publish call either sends one JSON document or streams its payload
//! behind a JSON prelude. The caller picks the shape through [`Message`].
//!
//! # Shapes
//!
//! | Message | Header | Body |
//! |---------|--------|------|
//! | [`Message::Buffered`] | none | `{route fields.., "message": value}` |
//! | [`Message::Streamed`] | `X-Sinkr-Stream: true` | `{route fields..}` then raw chunks |

// ============================================================================
// Imports
// ============================================================================

use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::result::Result as StdResult;

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::{Body, RequestBuilder};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::config::STREAM_HEADER;
use crate::error::Result;

use super::Route;

// ============================================================================
// Types
// ============================================================================

/// Boxed error produced by a chunk stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stream of raw payload chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = StdResult<Bytes, BoxError>> + Send>>;

// ============================================================================
// Message
// ============================================================================

/// Message payload for the send and broadcast operations.
///
/// Strings, sequences and maps are always buffered. Streaming is opt-in
/// through [`Message::stream`], [`Message::chunks`] or [`Message::reader`].
pub enum Message {
    /// Embedded as the `message` field of a single JSON body.
    Buffered(Value),
    /// Sent as raw chunks after the JSON prelude, never fully buffered.
    Streamed(ChunkStream),
}

impl Message {
    /// Creates a buffered message from any serializable value.
    ///
    /// # Errors
    ///
    /// [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::Buffered(serde_json::to_value(value)?))
    }

    /// Creates a streamed message from a fallible chunk stream.
    pub fn stream<S, B, E>(chunks: S) -> Self
    where
        S: Stream<Item = StdResult<B, E>> + Send + 'static,
        B: Into<Bytes>,
        E: Into<BoxError>,
    {
        Self::Streamed(Box::pin(chunks.map(
            |chunk| -> StdResult<Bytes, BoxError> { chunk.map(Into::into).map_err(Into::into) },
        )))
    }

    /// Creates a streamed message from an iterator of chunks.
    ///
    /// Chunks are pulled lazily while the request body is written.
    pub fn chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: Into<Bytes> + 'static,
    {
        Self::stream(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)))
    }

    /// Creates a streamed message that forwards an async reader.
    pub fn reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::stream(ReaderStream::new(reader))
    }

    /// Returns `true` if this message is streamed.
    #[inline]
    #[must_use]
    pub fn is_streamed(&self) -> bool {
        matches!(self, Self::Streamed(_))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(value) => f.debug_tuple("Buffered").field(value).finish(),
            Self::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Self::Buffered(value)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Self::Buffered(Value::Object(map))
    }
}

impl From<Vec<Value>> for Message {
    fn from(items: Vec<Value>) -> Self {
        Self::Buffered(Value::Array(items))
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::Buffered(Value::String(text.to_owned()))
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::Buffered(Value::String(text))
    }
}

// ============================================================================
// OutboundBody
// ============================================================================

/// A request body with its shape decided.
pub enum OutboundBody {
    /// One JSON document.
    Buffered(Value),
    /// JSON prelude followed by raw chunks.
    Streamed {
        /// JSON-encoded route object.
        prelude: Bytes,
        /// Payload chunks, emitted as-is.
        chunks: ChunkStream,
    },
}

impl OutboundBody {
    /// Builds the body for `route`, embedding or streaming `message`.
    ///
    /// # Errors
    ///
    /// [`Error::Json`](crate::Error::Json) if the route or message cannot be
    /// serialized.
    pub fn build(route: &Route<'_>, message: Option<Message>) -> Result<Self> {
        match message {
            Some(Message::Streamed(chunks)) => Ok(Self::Streamed {
                prelude: Bytes::from(serde_json::to_vec(route)?),
                chunks,
            }),
            Some(Message::Buffered(value)) => {
                let mut body = serde_json::to_value(route)?;
                if let Value::Object(fields) = &mut body {
                    fields.insert("message".to_owned(), value);
                }
                Ok(Self::Buffered(body))
            }
            None => Ok(Self::Buffered(serde_json::to_value(route)?)),
        }
    }

    /// Returns `true` if this body is streamed.
    #[inline]
    #[must_use]
    pub fn is_streamed(&self) -> bool {
        matches!(self, Self::Streamed { .. })
    }

    /// Attaches this body (and the stream header, if streamed) to a request.
    pub(crate) fn attach(self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Buffered(value) => request.json(&value),
            Self::Streamed { prelude, chunks } => {
                let body = stream::once(async move { Ok::<_, BoxError>(prelude) }).chain(chunks);
                request
                    .header(STREAM_HEADER, "true")
                    .body(Body::wrap_stream(body))
            }
        }
    }
}

impl fmt::Debug for OutboundBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(value) => f.debug_tuple("Buffered").field(value).finish(),
            Self::Streamed { prelude, .. } => f
                .debug_struct("Streamed")
                .field("prelude", prelude)
                .finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
