//! Provider Registry
//!
//! Holds the configured providers and routes each generation call to the one
//! named by the research request. This is the provider-selection surface: a
//! request names its provider explicitly and the registry never substitutes
//! another one, so a failing provider fails the run instead of silently
//! switching models mid-research.

use super::anthropic::AnthropicProvider;
use super::gemini::GeminiProvider;
use super::ollama::OllamaProvider;
use super::openai::OpenAIProvider;
use super::{GenerationRequest, LLMError, LLMProvider, TextGenerator};
use crate::config::LLMConfig;
use crate::secrets::SecretCache;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Availability snapshot of one provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub local: bool,
    pub default_model: String,
    pub healthy: bool,
}

/// Registry of available providers keyed by provider id
pub struct ProviderRegistry {
    providers: Vec<Box<dyn LLMProvider>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Box<dyn LLMProvider>>) -> Self {
        Self { providers }
    }

    /// Register every known provider from configuration.
    ///
    /// Cloud providers are always registered; a missing API key only shows up
    /// as an unhealthy status and as an authentication error when called.
    pub fn from_config(config: &LLMConfig, secret_cache: Arc<SecretCache>) -> Self {
        let providers: Vec<Box<dyn LLMProvider>> = vec![
            Box::new(OllamaProvider::from_config(&config.ollama)),
            Box::new(OpenAIProvider::new(
                config.openai.clone(),
                Arc::clone(&secret_cache),
            )),
            Box::new(AnthropicProvider::new(
                config.anthropic.clone(),
                Arc::clone(&secret_cache),
            )),
            Box::new(GeminiProvider::new(config.gemini.clone(), secret_cache)),
        ];
        Self::new(providers)
    }

    /// Look up a provider by id
    pub fn get(&self, name: &str) -> Option<&dyn LLMProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Query every provider's health
    pub async fn health(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            statuses.push(ProviderStatus {
                name: provider.name().to_string(),
                local: provider.is_local(),
                default_model: provider.default_model().to_string(),
                healthy: provider.check_health().await,
            });
        }
        statuses
    }
}

#[async_trait]
impl TextGenerator for ProviderRegistry {
    async fn generate(
        &self,
        provider: &str,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> super::Result<String> {
        let selected = self
            .get(provider)
            .ok_or_else(|| LLMError::UnknownProvider(provider.to_string()))?;

        debug!(
            "Dispatching generation to {} (model={}, max_tokens={})",
            provider,
            request.model_or(selected.default_model()),
            request.max_tokens
        );

        selected.generate(request, cancel).await
    }
}
