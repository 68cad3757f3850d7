//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use intersynth_core::{GenerationBackend, ProviderError, ProviderProfile, Result};

use crate::config::AdapterConfig;
use crate::error::{decode_response, non_empty, transport_error};

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, joined.
    pub fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Gemini backend bound to one model.
pub struct GeminiBackend {
    client: Client,
    config: AdapterConfig,
    profile: ProviderProfile,
}

impl GeminiBackend {
    pub fn new(profile: ProviderProfile, config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        let client = config.http_client()?;

        info!(
            provider = "google",
            model = %profile.model,
            base_url = %config.base_url,
            "Initializing Gemini backend"
        );

        Ok(Self {
            client,
            config,
            profile,
        })
    }

    pub fn build_request_body(&self, prompt: &str, max_tokens: u32) -> GenerateContentRequest {
        let caps = &self.profile.capabilities;
        GenerateContentRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: caps.clamp_tokens(max_tokens),
                temperature: caps.accepts_temperature.then_some(self.config.temperature),
            },
        }
    }

    fn endpoint(&self) -> String {
        self.config
            .url(&format!("/models/{}:generateContent", self.profile.model))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> std::result::Result<String, ProviderError> {
        let request = self.build_request_body(prompt, max_tokens);
        debug!(
            provider = "google",
            model = %self.profile.model,
            prompt_len = prompt.len(),
            max_tokens = request.generation_config.max_output_tokens,
            "Generating"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.key())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let result: GenerateContentResponse = decode_response(response).await?;
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

    fn backend() -> GeminiBackend {
        let profile = ModelRegistry::new().resolve(Provider::Google, "gemini-2.0-flash");
        let config = AdapterConfig::new(Provider::Google).with_api_key("g-test");
        GeminiBackend::new(profile, config).unwrap()
    }

    #[test]
    fn test_request_uses_generation_config() {
        let body = backend().build_request_body("prompt", 6000);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 6000);
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
    }

    #[test]
    fn test_endpoint_includes_model() {
        assert!(backend()
            .endpoint()
            .ends_with("/models/gemini-2.0-flash:generateContent"));
    }

    #[test]
    fn test_response_joins_parts() {
        let json = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"A"},{"text":"B"}]},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text(), "AB");
    }

    #[test]
    fn test_blocked_response_is_empty() {
        let json = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text(), "");
    }
}
