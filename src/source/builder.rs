//! Builder pattern for source configuration.
//!
//! # Example
//!
//! ```no_run
//! use sinkr::Source;
//!
//! # fn example() -> sinkr::Result<()> {
//! let source = Source::builder()
//!     .url("https://relay.example")
//!     .app_id("app1")
//!     .app_key("secret")
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! Values not set explicitly fall back to `SINKR_URL`, `SINKR_APP_ID` and
//! `SINKR_APP_KEY`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::config::env::{self, APP_ID_VAR, APP_KEY_VAR, URL_VAR, explicit_or_env};
use crate::config::{Endpoint, Transport};
use crate::error::{Error, Result};

use super::client::Source;

// ============================================================================
// SourceBuilder
// ============================================================================

/// Builder for configuring a [`Source`].
///
/// Use [`Source::builder()`] to create a new builder.
#[derive(Clone, Default)]
pub struct SourceBuilder {
    url: Option<String>,
    app_id: Option<String>,
    app_key: Option<String>,
}

impl fmt::Debug for SourceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBuilder")
            .field("url", &self.url)
            .field("app_id", &self.app_id)
            .field("app_key", &self.app_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ============================================================================
// SourceBuilder Implementation
// ============================================================================

impl SourceBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relay base URL.
    ///
    /// Non-HTTP schemes are rewritten to `https`.
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the application id.
    #[inline]
    #[must_use]
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Sets the application key sent as the bearer credential.
    #[inline]
    #[must_use]
    pub fn app_key(mut self, app_key: impl Into<String>) -> Self {
        self.app_key = Some(app_key.into());
        self
    }

    /// Builds the source.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL or app key is missing
    /// - [`Error::Config`] if the endpoint cannot be resolved
    /// - [`Error::Http`] if the HTTP client cannot be initialized
    pub fn build(self) -> Result<Source> {
        self.build_with_env(env::process_env)
    }

    /// Builds using `lookup` instead of the process environment.
    pub(crate) fn build_with_env<F>(self, lookup: F) -> Result<Source>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = explicit_or_env(self.url, URL_VAR, &lookup).ok_or_else(|| {
            Error::config(format!(
                "Relay URL is required. Use .url() or set {URL_VAR}."
            ))
        })?;
        let app_key = explicit_or_env(self.app_key, APP_KEY_VAR, &lookup).ok_or_else(|| {
            Error::config(format!(
                "Application key is required. Use .app_key() or set {APP_KEY_VAR}."
            ))
        })?;
        let app_id = explicit_or_env(self.app_id, APP_ID_VAR, &lookup);

        let endpoint = Endpoint::resolve(Transport::Http, &url, app_id.as_deref())?;

        Source::new(endpoint, &app_key)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_build_resolves_http_endpoint() {
        let source = SourceBuilder::new()
            .url("wss://relay.example")
            .app_id("app1")
            .app_key("secret")
            .build_with_env(no_env)
            .expect("build");

        assert_eq!(source.endpoint().as_str(), "https://relay.example/app1");
    }

    #[test]
    fn test_missing_app_key() {
        let err = SourceBuilder::new()
            .url("https://relay.example")
            .app_id("app1")
            .build_with_env(no_env)
            .unwrap_err();

        assert!(err.is_config_error());
        assert!(err.to_string().contains(APP_KEY_VAR));
    }

    #[test]
    fn test_empty_app_key_counts_as_missing() {
        let err = SourceBuilder::new()
            .url("https://relay.example")
            .app_id("app1")
            .app_key("")
            .build_with_env(no_env)
            .unwrap_err();

        assert!(err.is_config_error());
    }

    #[test]
    fn test_missing_url() {
        let err = SourceBuilder::new()
            .app_key("secret")
            .build_with_env(no_env)
            .unwrap_err();

        assert!(err.to_string().contains(URL_VAR));
    }

    #[test]
    fn test_invalid_key_characters() {
        let err = SourceBuilder::new()
            .url("https://relay.example")
            .app_id("app1")
            .app_key("line\nbreak")
            .build_with_env(no_env)
            .unwrap_err();

        assert!(err.is_config_error());
    }

    #[test]
    fn test_environment_fallback() {
        let source = SourceBuilder::new()
            .build_with_env(|name| match name {
                URL_VAR => Some("relay.example".to_owned()),
                APP_ID_VAR => Some("from-env".to_owned()),
                APP_KEY_VAR => Some("env-key".to_owned()),
                _ => None,
            })
            .expect("build");

        assert_eq!(source.endpoint().as_str(), "https://relay.example/from-env");
    }

    #[test]
    fn test_debug_redacts_key() {
        let builder = SourceBuilder::new().app_key("top-secret");
        let rendered = format!("{builder:?}");

        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
