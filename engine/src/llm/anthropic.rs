use super::{with_cancellation, GenerationRequest, LLMError, LLMProvider};
use crate::config::ProviderConfig;
use crate::secrets::SecretCache;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct AnthropicProvider {
    config: ProviderConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig, secret_cache: Arc<SecretCache>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config,
            secret_cache,
            client,
        }
    }

    fn build_payload(&self, request: &GenerationRequest) -> serde_json::Value {
        // Anthropic caps temperature at 1.0
        json!({
            "model": request.model_or(&self.config.model),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature.min(1.0),
            "system": request.system_prompt,
            "messages": [{
                "role": "user",
                "content": request.user_prompt
            }],
        })
    }

    async fn send(&self, payload: serde_json::Value) -> super::Result<String> {
        let api_key = self
            .secret_cache
            .get_secret("anthropic_api_key")
            .map_err(|e| LLMError::AuthenticationFailed(e.to_string()))?;

        let url = format!("{}/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key.unsecure())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::from_transport(e, "Anthropic", &self.config.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, &text));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let content_arr = data
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LLMError::ParseError("No content array in response".to_string()))?;

        let mut full_content = String::new();
        for item in content_arr {
            if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
                full_content.push_str(text);
            }
        }

        Ok(full_content)
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn is_local(&self) -> bool {
        false
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn check_health(&self) -> bool {
        self.secret_cache.has_secret("anthropic_api_key")
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> super::Result<String> {
        let payload = self.build_payload(request);
        with_cancellation(cancel, self.send(payload)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretManager;

    #[test]
    fn test_payload_uses_top_level_system() {
        let cache = Arc::new(SecretCache::new(Arc::new(SecretManager::new("test"))));
        let provider = AnthropicProvider::new(ProviderConfig::anthropic(), cache);

        let request = GenerationRequest::new("", "system text", "user text", 2048, 1.8);
        let payload = provider.build_payload(&request);

        assert_eq!(payload["system"], "system text");
        assert_eq!(payload["messages"].as_array().unwrap().len(), 1);
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["max_tokens"], 2048);
        assert_eq!(payload["temperature"], 1.0);
    }
}
