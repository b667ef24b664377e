//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for the text-generation services a
//! research run talks to (Ollama, OpenAI, Anthropic, Gemini). The research
//! engine never sees a concrete provider: it depends on the [`TextGenerator`]
//! capability, which the [`registry::ProviderRegistry`] implements by routing
//! on the provider id carried by each research request.
//!
//! Every generation call takes a [`CancellationToken`]. Providers race their
//! HTTP future against the token so that an in-flight call observes a user
//! cancellation and returns [`LLMError::Cancelled`] instead of completing
//! uselessly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod registry;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
///
/// `Cancelled` is a user-initiated stop and is never reported as a failure;
/// every other variant is a generation failure that ends a research run.
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl LLMError {
    /// Whether this error is a cooperative cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LLMError::Cancelled)
    }

    /// Map a reqwest transport error onto the provider error taxonomy
    pub(crate) fn from_transport(err: reqwest::Error, provider: &str, base_url: &str) -> Self {
        if err.is_timeout() {
            LLMError::Timeout
        } else if err.is_connect() {
            LLMError::ProviderUnavailable(format!(
                "Cannot connect to {} at {}",
                provider, base_url
            ))
        } else {
            LLMError::NetworkError(crate::secrets::scrub_secrets(&err.to_string()))
        }
    }

    /// Map a non-success HTTP status and body onto the provider error taxonomy
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = crate::secrets::scrub_secrets(body);
        match status.as_u16() {
            401 | 403 => LLMError::AuthenticationFailed(body),
            429 => LLMError::RateLimitExceeded,
            500..=599 => LLMError::ProviderUnavailable(format!("HTTP {}: {}", status, body)),
            _ => LLMError::InvalidRequest(format!("HTTP {}: {}", status, body)),
        }
    }
}

/// Message in a generation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// One request/response generation call: a system instruction, a user
/// instruction and sampling limits.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Model id; an empty string selects the provider's configured default
    pub model: String,

    pub system_prompt: String,

    pub user_prompt: String,

    pub max_tokens: u32,

    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens,
            temperature,
        }
    }

    /// The request as a system + user message pair
    pub fn messages(&self) -> [Message; 2] {
        [
            Message::system(&self.system_prompt),
            Message::user(&self.user_prompt),
        ]
    }

    /// Model to send, falling back to the provider default
    pub fn model_or<'a>(&'a self, default_model: &'a str) -> &'a str {
        if self.model.trim().is_empty() {
            default_model
        } else {
            &self.model
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the provider id (e.g., "ollama", "openai", "anthropic")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Model used when the request leaves `model` empty
    fn default_model(&self) -> &str;

    /// Perform one generation call and return its text.
    ///
    /// Implementations must return `LLMError::Cancelled` promptly once
    /// `cancel` fires, even if the HTTP request is still in flight.
    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// Check if the provider is currently usable.
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// The opaque generation capability consumed by the research engine.
///
/// `provider` is the provider id carried by the research request.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        provider: &str,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Race `fut` against `cancel`, returning `LLMError::Cancelled` if the token
/// fires first. A token that is already cancelled never polls `fut`.
pub async fn with_cancellation<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LLMError::Cancelled),
        result = fut => result,
    }
}
