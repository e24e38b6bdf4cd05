//! Publish client.
//!
//! One authenticated POST per operation. The raw response is handed back
//! unchecked; status handling and retries are the caller's business.
//!
//! # Operations
//!
//! | Method | Route |
//! |--------|-------|
//! | [`Source::authenticate_user`] | `authenticate` |
//! | [`Source::subscribe_to_channel`] | `subscribe` |
//! | [`Source::unsubscribe_from_channel`] | `unsubscribe` |
//! | [`Source::send_message_to_channel`] | `channel` |
//! | [`Source::send_message_to_user`] | `direct` |
//! | [`Source::broadcast_message`] | `broadcast` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use reqwest::Response;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::Endpoint;
use crate::error::{Error, Result};
use crate::protocol::{Message, OutboundBody, Route};

use super::builder::SourceBuilder;

// ============================================================================
// Source
// ============================================================================

/// Publishing client.
///
/// Cheap to clone; clones share one connection pool.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use sinkr::{Message, Source};
///
/// # async fn example() -> sinkr::Result<()> {
/// let source = Source::builder()
///     .url("https://relay.example")
///     .app_id("app1")
///     .app_key("secret")
///     .build()?;
///
/// // Buffered: one JSON body
/// source.send_message_to_channel("room1", "msg", json!({ "text": "hi" })).await?;
///
/// // Streamed: JSON prelude, then the chunks
/// let chunks = Message::chunks(vec!["part one, ", "part two"]);
/// let response = source.broadcast_message("log", chunks).await?;
/// println!("relay answered {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Source {
    endpoint: Endpoint,
    http: reqwest::Client,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Source - Constructor
// ============================================================================

impl Source {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SourceBuilder {
        SourceBuilder::new()
    }

    /// Creates a client for a resolved endpoint.
    ///
    /// Every request carries `Authorization: Bearer <app_key>`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `app_key` is not a valid header value
    /// - [`Error::Http`] if the HTTP client cannot be initialized
    pub fn new(endpoint: Endpoint, app_key: &str) -> Result<Self> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {app_key}"))
            .map_err(|_| Error::config("Application key contains invalid header characters"))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { endpoint, http })
    }

    /// Returns the resolved endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

// ============================================================================
// Source - Operations
// ============================================================================

impl Source {
    /// Attaches user info to a connected peer.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `user_info` is not a JSON object
    /// - [`Error::Http`] on transport failure
    pub async fn authenticate_user<T>(
        &self,
        peer_id: &str,
        user_id: &str,
        user_info: &T,
    ) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let user_info = serde_json::to_value(user_info)?;
        if !user_info.is_object() {
            return Err(Error::invalid_argument("user info must be a JSON object"));
        }

        self.fetch(
            Route::Authenticate {
                peer_id,
                id: user_id,
                user_info,
            },
            None,
        )
        .await
    }

    /// Subscribes a peer to a channel.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] on transport failure.
    pub async fn subscribe_to_channel(
        &self,
        subscriber_id: &str,
        channel: &str,
    ) -> Result<Response> {
        self.fetch(
            Route::Subscribe {
                subscriber_id,
                channel,
            },
            None,
        )
        .await
    }

    /// Unsubscribes a peer from a channel.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] on transport failure.
    pub async fn unsubscribe_from_channel(
        &self,
        subscriber_id: &str,
        channel: &str,
    ) -> Result<Response> {
        self.fetch(
            Route::Unsubscribe {
                subscriber_id,
                channel,
            },
            None,
        )
        .await
    }

    /// Sends `event` to every subscriber of `channel`.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] on transport failure or a failing chunk stream.
    pub async fn send_message_to_channel(
        &self,
        channel: &str,
        event: &str,
        message: impl Into<Message>,
    ) -> Result<Response> {
        self.fetch(Route::Channel { event, channel }, Some(message.into())).await
    }

    /// Sends `event` to one user.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] on transport failure or a failing chunk stream.
    pub async fn send_message_to_user(
        &self,
        recipient_id: &str,
        event: &str,
        message: impl Into<Message>,
    ) -> Result<Response> {
        self.fetch(
            Route::Direct {
                event,
                recipient_id,
            },
            Some(message.into()),
        )
        .await
    }

    /// Sends `event` to every connected peer.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] on transport failure or a failing chunk stream.
    pub async fn broadcast_message(
        &self,
        event: &str,
        message: impl Into<Message>,
    ) -> Result<Response> {
        self.fetch(Route::Broadcast { event }, Some(message.into())).await
    }

    /// Builds the body for `route` and posts it.
    async fn fetch(&self, route: Route<'_>, message: Option<Message>) -> Result<Response> {
        let body = OutboundBody::build(&route, message)?;

        debug!(
            route = route.tag(),
            streamed = body.is_streamed(),
            endpoint = %self.endpoint,
            "Publishing"
        );

        let request = body.attach(self.http.post(self.endpoint.as_str()));
        let response = request.send().await?;

        trace!(route = route.tag(), status = %response.status(), "Relay responded");

        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================
