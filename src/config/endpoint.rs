//! Endpoint resolution.
//!
//! Turns a base URL plus an optional application id into the fully
//! qualified relay endpoint used by the sink and the source.
//!
//! # Rules
//!
//! | Input | Result |
//! |-------|--------|
//! | Scheme not valid for the transport | Rewritten to `wss` / `https` |
//! | No scheme at all | `wss://` / `https://` prepended |
//! | Empty path, app id given | App id becomes the path |
//! | Empty path, no app id | [`Error::Config`] |
//! | Path present | Used verbatim, app id ignored |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Transport
// ============================================================================

/// Transport family an endpoint is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Persistent WebSocket connection (sink side).
    WebSocket,
    /// Request/response HTTP calls (source side).
    Http,
}

impl Transport {
    /// Returns the secure default scheme for this transport.
    #[inline]
    #[must_use]
    pub const fn secure_scheme(self) -> &'static str {
        match self {
            Self::WebSocket => "wss",
            Self::Http => "https",
        }
    }

    /// Returns `true` if `scheme` is valid for this transport.
    #[inline]
    #[must_use]
    pub fn accepts(self, scheme: &str) -> bool {
        match self {
            Self::WebSocket => matches!(scheme, "ws" | "wss"),
            Self::Http => matches!(scheme, "http" | "https"),
        }
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// A resolved relay endpoint.
///
/// The path always identifies exactly one application instance.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Resolves an endpoint from a base URL and optional application id.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL cannot be parsed or has no host
    /// - [`Error::Config`] if the URL has no path and no app id is given
    pub fn resolve(transport: Transport, base_url: &str, app_id: Option<&str>) -> Result<Self> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(Error::config("missing base url"));
        }

        let normalized = normalize_scheme(transport, base_url);
        let mut url = Url::parse(&normalized)
            .map_err(|e| Error::config(format!("invalid url {base_url:?}: {e}")))?;

        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::config(format!("url {base_url:?} has no host")));
        }

        if url.path().len() <= 1 {
            let app_id = app_id
                .map(|id| id.trim_matches('/'))
                .filter(|id| !id.is_empty())
                .ok_or_else(|| Error::config("missing application id"))?;

            url.set_path(&collapse_slashes(&format!("/{app_id}")));
        }

        Ok(Self { url })
    }

    /// Returns the URL scheme (`ws`, `wss`, `http` or `https`).
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Returns the path identifying the application.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Returns the full URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the URL as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Forces a transport-appropriate scheme onto `raw`.
fn normalize_scheme(transport: Transport, raw: &str) -> String {
    let secure = transport.secure_scheme();

    match raw.split_once("://") {
        Some((scheme, _))
            if is_scheme(scheme) && transport.accepts(&scheme.to_ascii_lowercase()) =>
        {
            raw.to_string()
        }
        Some((scheme, rest)) if is_scheme(scheme) => format!("{secure}://{rest}"),
        _ => format!("{secure}://{raw}"),
    }
}

/// RFC 3986 scheme syntax: a letter followed by letters, digits, `+`, `-`, `.`.
fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Collapses runs of `/` into one.
fn collapse_slashes(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_appends_app_id_to_empty_path() {
        let endpoint =
            Endpoint::resolve(Transport::WebSocket, "wss://relay.example", Some("app1")).unwrap();
        assert_eq!(endpoint.as_str(), "wss://relay.example/app1");
        assert_eq!(endpoint.path(), "/app1");
    }

    #[test]
    fn test_trailing_slash_counts_as_empty_path() {
        let endpoint =
            Endpoint::resolve(Transport::Http, "https://relay.example/", Some("/app1/")).unwrap();
        assert_eq!(endpoint.as_str(), "https://relay.example/app1");
    }

    #[test]
    fn test_existing_path_wins_over_app_id() {
        let base = "https://relay.example/mine";
        let endpoint = Endpoint::resolve(Transport::Http, base, Some("other")).unwrap();
        assert_eq!(endpoint.path(), "/mine");
    }

    #[test]
    fn test_missing_app_id_is_config_error() {
        let err = Endpoint::resolve(Transport::WebSocket, "wss://relay.example", None).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("missing application id"));
    }

    #[test]
    fn test_empty_app_id_is_config_error() {
        let err =
            Endpoint::resolve(Transport::WebSocket, "wss://relay.example", Some("//")).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_upgrades_http_scheme_for_websocket() {
        let endpoint =
            Endpoint::resolve(Transport::WebSocket, "http://relay.example/app1", None).unwrap();
        assert_eq!(endpoint.scheme(), "wss");
        assert_eq!(endpoint.host(), "relay.example");
    }

    #[test]
    fn test_keeps_plain_ws_scheme() {
        let endpoint =
            Endpoint::resolve(Transport::WebSocket, "ws://127.0.0.1:9000", Some("app1")).unwrap();
        assert_eq!(endpoint.as_str(), "ws://127.0.0.1:9000/app1");
    }

    #[test]
    fn test_upgrades_ws_scheme_for_http() {
        let endpoint = Endpoint::resolve(Transport::Http, "ws://relay.example/app1", None).unwrap();
        assert_eq!(endpoint.scheme(), "https");
    }

    #[test]
    fn test_missing_scheme_gets_secure_default() {
        let endpoint = Endpoint::resolve(Transport::Http, "relay.example", Some("app1")).unwrap();
        assert_eq!(endpoint.as_str(), "https://relay.example/app1");
    }

    #[test]
    fn test_empty_url_is_config_error() {
        let err = Endpoint::resolve(Transport::Http, "   ", Some("app1")).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_collapse_slashes() {
        assert_eq!(collapse_slashes("//a//b/"), "/a/b");
        assert_eq!(collapse_slashes("/app1"), "/app1");
    }

    proptest! {
        #[test]
        fn prop_no_path_no_app_id_fails(
            scheme in "[a-z][a-z0-9+]{0,6}",
            host in "[a-z]{1,12}\\.example",
            slash in proptest::bool::ANY,
        ) {
            let url = format!("{scheme}://{host}{}", if slash { "/" } else { "" });
            for transport in [Transport::WebSocket, Transport::Http] {
                let result = Endpoint::resolve(transport, &url, None);
                prop_assert!(result.is_err_and(|e| e.is_config_error()));
            }
        }

        #[test]
        fn prop_foreign_scheme_is_upgraded(
            scheme in "[a-z][a-z0-9+]{0,6}",
            host in "[a-z]{1,12}\\.example",
            app in "[a-zA-Z0-9_-]{1,16}",
        ) {
            let url = format!("{scheme}://{host}");

            let ws = Endpoint::resolve(Transport::WebSocket, &url, Some(&app)).unwrap();
            if scheme != "ws" && scheme != "wss" {
                prop_assert_eq!(ws.scheme(), "wss");
            } else {
                prop_assert_eq!(ws.scheme(), scheme.as_str());
            }

            let http = Endpoint::resolve(Transport::Http, &url, Some(&app)).unwrap();
            if scheme != "http" && scheme != "https" {
                prop_assert_eq!(http.scheme(), "https");
            } else {
                prop_assert_eq!(http.scheme(), scheme.as_str());
            }

            prop_assert_eq!(ws.path(), format!("/{app}"));
        }
    }
}
