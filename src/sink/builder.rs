//! Builder pattern for sink configuration.
//!
//! # Example
//!
//! ```no_run
//! use sinkr::Sink;
//!
//! # fn example() -> sinkr::Result<()> {
//! let sink = Sink::builder()
//!     .url("wss://relay.example")
//!     .app_id("app1")
//!     .history_capacity(64)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! Values not set explicitly fall back to `SINKR_URL` and `SINKR_APP_ID`.

// ============================================================================
// Imports
// ============================================================================

use crate::config::env::{self, APP_ID_VAR, URL_VAR, explicit_or_env};
use crate::config::{DEFAULT_HISTORY_CAPACITY, Endpoint, Transport};
use crate::error::{Error, Result};

use super::session::Sink;

// ============================================================================
// SinkBuilder
// ============================================================================

/// Builder for configuring a [`Sink`].
///
/// Use [`Sink::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct SinkBuilder {
    /// Relay base URL.
    url: Option<String>,
    /// Application id appended to a path-less URL.
    app_id: Option<String>,
    /// Raw frames kept in history.
    history_capacity: usize,
}

impl Default for SinkBuilder {
    fn default() -> Self {
        Self {
            url: None,
            app_id: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

// ============================================================================
// SinkBuilder Implementation
// ============================================================================

impl SinkBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relay base URL.
    ///
    /// Non-WebSocket schemes are rewritten to `wss`.
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the application id.
    ///
    /// Ignored when the URL already has a path.
    #[inline]
    #[must_use]
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Sets how many raw frames the sink retains (0 disables history).
    #[inline]
    #[must_use]
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Builds a closed sink.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no URL is set or in the environment
    /// - [`Error::Config`] if the endpoint cannot be resolved
    pub fn build(self) -> Result<Sink> {
        self.build_with_env(env::process_env)
    }

    /// Builds using `lookup` instead of the process environment.
    pub(crate) fn build_with_env<F>(self, lookup: F) -> Result<Sink>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = explicit_or_env(self.url, URL_VAR, &lookup).ok_or_else(|| {
            Error::config(format!(
                "Relay URL is required. Use .url() or set {URL_VAR}."
            ))
        })?;
        let app_id = explicit_or_env(self.app_id, APP_ID_VAR, &lookup);

        let endpoint = Endpoint::resolve(Transport::WebSocket, &url, app_id.as_deref())?;

        Ok(Sink::new(endpoint, self.history_capacity))
    }
}

// ============================================================================
// Tests
// ============================================================================
