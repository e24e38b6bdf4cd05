//! Receiving side.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Sink`] | Connection session with receive loop |
//! | [`SinkBuilder`] | Fluent configuration builder |
//! | [`CallbackRegistry`] | Event → listener dispatch table |
//! | [`ListenerHandle`] | Disposer for one registration |
//! | [`MessageStream`] | Async stream of parsed messages |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for sink configuration.
pub mod builder;

/// Bounded raw frame history.
pub mod history;

/// Listener registration and dispatch.
pub mod registry;

/// Connection session and receive loop.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SinkBuilder;
pub use history::History;
pub use registry::{CallbackRegistry, DispatchOutcome, EventFilter, Handler, ListenerHandle};
pub use session::{CloseReason, MessageStream, Sink};
