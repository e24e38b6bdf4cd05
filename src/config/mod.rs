//! Client configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Endpoint`] | Resolved relay URL |
//! | [`Transport`] | Scheme family (WebSocket or HTTP) |
//! | [`env`] | Environment variable names and lookup |

// ============================================================================
// Submodules
// ============================================================================

/// Base URL + application id resolution.
pub mod endpoint;

/// Environment-sourced defaults.
pub mod env;

// ============================================================================
// Constants
// ============================================================================

/// Default number of raw frames retained in sink history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1024;

/// Header marking a streamed publish request.
pub const STREAM_HEADER: &str = "X-Sinkr-Stream";

// ============================================================================
// Re-exports
// ============================================================================

pub use endpoint::{Endpoint, Transport};
