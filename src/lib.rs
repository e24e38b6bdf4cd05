//! Sinkr - Client library for the Sinkr publish/subscribe relay.
//!
//! Two independent clients talk to one relay:
//!
//! - **Sink**: holds a WebSocket connection, receives event frames and
//!   dispatches them to registered callbacks
//! - **Source**: publishes over authenticated HTTP POSTs, either as a
//!   single JSON body or as a JSON prelude followed by a byte stream
//!
//! Key design principles:
//!
//! - Each [`Sink`] owns one connection and one background receive loop
//! - Listener registrations return a [`ListenerHandle`] that disposes them
//! - A panicking listener never stops delivery to the others
//! - The [`Source`] never interprets relay responses
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use sinkr::{Result, Sink, Source};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let sink = Sink::builder()
//!         .url("wss://relay.example")
//!         .app_id("app1")
//!         .build()?;
//!
//!     let handle = sink.on("msg", |data| println!("got {data}"));
//!     sink.open().await?;
//!
//!     let source = Source::builder()
//!         .url("https://relay.example")
//!         .app_id("app1")
//!         .app_key("secret")
//!         .build()?;
//!     source
//!         .send_message_to_channel("room1", "msg", json!({ "text": "hi" }))
//!         .await?;
//!
//!     handle.dispose();
//!     sink.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Endpoint resolution and environment defaults |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire formats for both directions |
//! | [`sink`] | Receiving client: [`Sink`], [`CallbackRegistry`] |
//! | [`source`] | Publishing client: [`Source`] |

// ============================================================================
// Modules
// ============================================================================

/// Endpoint resolution and environment defaults.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Wire formats.
///
/// Inbound event frames, outbound route descriptors and message bodies.
pub mod protocol;

/// Receiving client.
///
/// Use [`Sink::builder()`] to create a configured sink.
pub mod sink;

/// Publishing client.
///
/// Use [`Source::builder()`] to create a configured source.
pub mod source;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::{Endpoint, Transport};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ListenerId;

// Protocol types
pub use protocol::{InboundMessage, Message};

// Sink types
pub use sink::{
    CallbackRegistry, CloseReason, DispatchOutcome, EventFilter, ListenerHandle, MessageStream,
    Sink, SinkBuilder,
};

// Source types
pub use source::{Source, SourceBuilder};
