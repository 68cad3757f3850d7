//! Anthropic messages-API backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use intersynth_core::{defaults, GenerationBackend, ProviderError, ProviderProfile, Result};

use crate::config::AdapterConfig;
use crate::error::{decode_response, non_empty, transport_error};

// ============================================================================
// API Types
// ============================================================================

/// Request body for `POST /messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl MessagesResponse {
    /// Concatenated text blocks; other block types are dropped.
    pub fn into_text(self) -> String {
        self.content
            .into_iter()
            .filter(|c| c.block_type.as_deref().unwrap_or("text") == "text")
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Anthropic backend bound to one model.
pub struct AnthropicBackend {
    client: Client,
    config: AdapterConfig,
    profile: ProviderProfile,
}

impl AnthropicBackend {
    pub fn new(profile: ProviderProfile, config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        let client = config.http_client()?;

        info!(
            provider = "anthropic",
            model = %profile.model,
            base_url = %config.base_url,
            "Initializing Anthropic backend"
        );

        Ok(Self {
            client,
            config,
            profile,
        })
    }

    pub fn build_request_body(&self, prompt: &str, max_tokens: u32) -> MessagesRequest {
        let caps = &self.profile.capabilities;
        MessagesRequest {
            model: self.profile.model.clone(),
            max_tokens: caps.clamp_tokens(max_tokens),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: caps.accepts_temperature.then_some(self.config.temperature),
        }
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> std::result::Result<String, ProviderError> {
        let request = self.build_request_body(prompt, max_tokens);
        debug!(
            provider = "anthropic",
            model = %self.profile.model,
            prompt_len = prompt.len(),
            max_tokens = request.max_tokens,
            "Generating"
        );

        let response = self
            .client
            .post(self.config.url("/messages"))
            .header("x-api-key", self.config.key())
            .header("anthropic-version", defaults::ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let result: MessagesResponse = decode_response(response).await?;
        let content = non_empty(result.into_text())?;

        debug!(response_len = content.len(), "Generation complete");
        Ok(content)
    }

    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    fn has_credentials(&self) -> bool {
        self.config.has_credentials()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::ModelRegistry;
    use intersynth_core::Provider;

    fn backend(model: &str) -> AnthropicBackend {
        let profile = ModelRegistry::new().resolve(Provider::Anthropic, model);
        let config = AdapterConfig::new(Provider::Anthropic).with_api_key("sk-ant-test");
        AnthropicBackend::new(profile, config).unwrap()
    }

    #[test]
    fn test_request_clamps_to_haiku_ceiling() {
        let body = backend("claude-3-haiku-20240307").build_request_body("prompt", 8000);
        assert_eq!(body.max_tokens, 4096);
        assert_eq!(body.temperature, Some(0.7));
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
    }

    #[test]
    fn test_response_skips_non_text_blocks() {
        let json = r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"Hello "},{"type":"text","text":"there"}]}"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text(), "Hello there");
    }
}
