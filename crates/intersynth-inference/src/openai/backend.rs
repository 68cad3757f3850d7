//! OpenAI chat-completions backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use intersynth_core::{
    GenerationBackend, ProviderError, ProviderProfile, Result, TokenLimitField,
};

use super::types::*;
use crate::config::AdapterConfig;
use crate::error::{decode_response, non_empty, transport_error};

/// OpenAI chat-completions backend bound to one model.
pub struct OpenAIBackend {
    client: Client,
    config: AdapterConfig,
    profile: ProviderProfile,
}

impl OpenAIBackend {
    pub fn new(profile: ProviderProfile, config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        let client = config.http_client()?;

        info!(
            provider = "openai",
            model = %profile.model,
            base_url = %config.base_url,
            "Initializing OpenAI backend"
        );

        Ok(Self {
            client,
            config,
            profile,
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Request body for `prompt`, shaped by the model's capabilities.
    pub fn build_request_body(&self, prompt: &str, max_tokens: u32) -> ChatCompletionRequest {
        let caps = &self.profile.capabilities;
        let budget = caps.clamp_tokens(max_tokens);
        let (max_tokens, max_completion_tokens) = match caps.token_field {
            TokenLimitField::MaxCompletionTokens => (None, Some(budget)),
            TokenLimitField::MaxTokens | TokenLimitField::MaxOutputTokens => (Some(budget), None),
        };

        ChatCompletionRequest {
            model: self.profile.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: caps.accepts_temperature.then_some(self.config.temperature),
            max_tokens,
            max_completion_tokens,
            reasoning_effort: caps.reasoning_effort,
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAIBackend {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> std::result::Result<String, ProviderError> {
        let request = self.build_request_body(prompt, max_tokens);
        debug!(
            provider = "openai",
            model = %self.profile.model,
            prompt_len = prompt.len(),
            max_tokens = request.max_tokens.or(request.max_completion_tokens),
            "Generating"
        );

        let response = self
            .client
            .post(self.config.url("/chat/completions"))
            .bearer_auth(self.config.key())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let result: ChatCompletionResponse = decode_response(response).await?;
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
    use intersynth_core::{Provider, ReasoningEffort};

    fn backend(model: &str) -> OpenAIBackend {
        let profile = ModelRegistry::new().resolve(Provider::OpenAi, model);
        let config = AdapterConfig::new(Provider::OpenAi).with_api_key("sk-test");
        OpenAIBackend::new(profile, config).unwrap()
    }

    #[test]
    fn test_chat_model_request_shape() {
        let body = backend("gpt-4o-2024-08-06").build_request_body("prompt", 4000);
        assert_eq!(body.max_tokens, Some(4000));
        assert_eq!(body.max_completion_tokens, None);
        assert_eq!(body.temperature, Some(0.7));
        assert_eq!(body.reasoning_effort, None);
    }

    #[test]
    fn test_reasoning_model_request_shape() {
        let body = backend("o3-mini-2025-01-31").build_request_body("prompt", 4000);
        assert_eq!(body.max_tokens, None);
        assert_eq!(body.max_completion_tokens, Some(4000));
        assert_eq!(body.temperature, None);
        assert_eq!(body.reasoning_effort, Some(ReasoningEffort::Medium));

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["reasoning_effort"], "medium");
    }

    #[test]
    fn test_budget_clamped_to_model_ceiling() {
        let body = backend("some-unknown-model").build_request_body("prompt", 8000);
        assert_eq!(body.max_tokens, Some(4096));
    }

    #[test]
    fn test_has_credentials() {
        assert!(backend("gpt-4o-2024-08-06").has_credentials());
        let profile = ModelRegistry::new().resolve(Provider::OpenAi, "gpt-4o-2024-08-06");
        let keyless = OpenAIBackend::new(profile, AdapterConfig::new(Provider::OpenAi)).unwrap();
        assert!(!keyless.has_credentials());
    }
}
