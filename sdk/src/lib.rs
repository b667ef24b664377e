//! DeepDive SDK
//!
//! Shared error taxonomy for the DeepDive engine and its front-ends.
//! Kept dependency-light so that any surface (CLI, server, tests) can
//! classify engine failures without pulling in the engine itself.

/// Error types and handling
pub mod errors;

// Re-export commonly used types
pub use errors::{DeepDiveErrorExt, EngineError};
