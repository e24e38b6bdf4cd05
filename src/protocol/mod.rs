//! Relay wire types.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`InboundMessage`] | Relay → Sink | Pushed event |
//! | [`Route`] | Source → Relay | Request metadata / prelude |
//! | [`OutboundBody`] | Source → Relay | Buffered or streamed request body |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `inbound` | Event frame parsing |
//! | `route` | Route tags and fields |
//! | `body` | Message payloads and body shapes |

// ============================================================================
// Submodules
// ============================================================================

/// Message payloads and body shape selection.
pub mod body;

/// Inbound event frames.
pub mod inbound;

/// Route tags and their fields.
pub mod route;

// ============================================================================
// Re-exports
// ============================================================================

pub use body::{BoxError, ChunkStream, Message, OutboundBody};
pub use inbound::InboundMessage;
pub use route::Route;
