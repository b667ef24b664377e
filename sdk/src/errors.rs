//! Error types and handling
//!
//! This module provides the error types used throughout the DeepDive engine.
//! All errors implement the `DeepDiveErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages carried to the progress surface are scrubbed by the engine
//! before they are wrapped here, so no API keys end up in a hint or message.

use thiserror::Error;

/// Trait for DeepDive error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait DeepDiveErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is a static string and never echoes the raw error payload.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by the user (for example by starting
    /// a new research run). Non-recoverable errors need a configuration change.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Database**: SQLite operation failures (history and memory)
/// - **LLM Provider**: generation failures surfaced from a run
/// - **Request**: invalid research parameters
/// - **Session**: concurrent-run violations
///
/// # Examples
///
/// ```
/// use sdk::errors::{DeepDiveErrorExt, EngineError};
///
/// let error = EngineError::RunInProgress;
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("bad provider".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    // Request validation errors
    #[error("Invalid research request: {0}")]
    InvalidRequest(String),

    // Session errors
    #[error("A research run is already in progress")]
    RunInProgress,

    #[error("Memory selection full: at most {0} contexts can be active")]
    MemorySelectionFull(usize),

    #[error("Not found: {0}")]
    NotFound(String),

    // Keyring errors
    #[error("Secret error: {0}")]
    Secret(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeepDiveErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::Database(_) => "History storage failed. Your research result is unaffected",

            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",
            Self::UnknownProvider(_) => "Run 'deepdive providers' to list configured providers",

            Self::InvalidRequest(_) => {
                "Provide a non-empty query, positive max tokens and a temperature in [0, 2]"
            }

            Self::RunInProgress => "Wait for the current run to finish or cancel it first",
            Self::MemorySelectionFull(_) => "Deselect a memory context before adding another",
            Self::NotFound(_) => "Check the identifier with 'deepdive history' or 'deepdive memory list'",

            Self::Secret(_) => "Failed to access secure storage. Set the <PROVIDER>_API_KEY variable",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::UnknownProvider(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
