//! Publishing side.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Source`] | Authenticated HTTP publisher |
//! | [`SourceBuilder`] | Fluent configuration builder |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for source configuration.
pub mod builder;

/// Publish operations.
pub mod client;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SourceBuilder;
pub use client::Source;
