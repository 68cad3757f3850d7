//! Model catalogue and capability registry.
//!
//! Every supported model is registered with the parameters its backend
//! accepts. Profiles are resolved here once per run; unknown model ids get a
//! conservative per-provider record instead of an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use intersynth_core::{
    ModelCapabilities, Provider, ProviderProfile, QualityTier, ReasoningEffort, TokenLimitField,
};

/// Output ceiling assumed for models missing from the registry.
pub const FALLBACK_MAX_OUTPUT_TOKENS: u32 = 4_096;

/// A catalogued model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub provider: Provider,
    pub model: String,
    pub capabilities: ModelCapabilities,
    pub description: String,
    pub best_for: String,
}

impl ModelEntry {
    pub fn profile(&self) -> ProviderProfile {
        ProviderProfile::new(self.provider, self.model.clone(), self.capabilities.clone())
    }
}

/// Registry of known models.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
    index: HashMap<String, usize>,
}

fn chat(max_output_tokens: u32, quality: QualityTier) -> ModelCapabilities {
    ModelCapabilities {
        max_output_tokens,
        accepts_temperature: true,
        reasoning_effort: None,
        token_field: TokenLimitField::MaxTokens,
        quality,
    }
}

fn reasoning(max_output_tokens: u32, quality: QualityTier) -> ModelCapabilities {
    ModelCapabilities {
        max_output_tokens,
        accepts_temperature: false,
        reasoning_effort: Some(ReasoningEffort::Medium),
        token_field: TokenLimitField::MaxCompletionTokens,
        quality,
    }
}

fn gemini(max_output_tokens: u32, quality: QualityTier) -> ModelCapabilities {
    ModelCapabilities {
        max_output_tokens,
        accepts_temperature: true,
        reasoning_effort: None,
        token_field: TokenLimitField::MaxOutputTokens,
        quality,
    }
}

// o1, o3-mini, o4-mini...
fn is_openai_reasoning_id(model: &str) -> bool {
    let mut chars = model.chars();
    chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

// Families known to accept `temperature` and `max_tokens`.
fn is_openai_legacy_chat_id(model: &str) -> bool {
    model.starts_with("gpt-4") || model.starts_with("gpt-3.5")
}

/// Unknown OpenAI ids outside the legacy chat families: no temperature and
/// `max_completion_tokens`, which every current chat-completions model takes.
fn openai_unknown(max_output_tokens: u32, quality: QualityTier) -> ModelCapabilities {
    ModelCapabilities {
        max_output_tokens,
        accepts_temperature: false,
        reasoning_effort: None,
        token_field: TokenLimitField::MaxCompletionTokens,
        quality,
    }
}

/// Canonical spelling of a model id. Accepts the dashed Gemini form
/// (`gemini-2-0-flash`) as an alias for `gemini-2.0-flash`.
pub fn normalize_model_id(model: &str) -> String {
    let model = model.trim();
    match model.strip_prefix("gemini-") {
        Some(rest) => {
            let mut parts = rest.splitn(3, '-');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(major), Some(minor), tail)
                    if major.chars().all(|c| c.is_ascii_digit())
                        && minor.chars().all(|c| c.is_ascii_digit())
                        && !minor.is_empty() =>
                {
                    match tail {
                        Some(tail) => format!("gemini-{}.{}-{}", major, minor, tail),
                        None => format!("gemini-{}.{}", major, minor),
                    }
                }
                _ => model.to_string(),
            }
        }
        None => model.to_string(),
    }
}

impl ModelRegistry {
    /// Create a registry with every supported model.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
            index: HashMap::new(),
        };

        // OpenAI
        registry.register(
            Provider::OpenAi,
            "gpt-4.5-preview-2025-02-27",
            chat(16_384, QualityTier::Premium),
            "Latest preview model with advanced capabilities",
            "Advanced reasoning and complex interview simulation",
        );
        registry.register(
            Provider::OpenAi,
            "gpt-4o-2024-08-06",
            chat(16_384, QualityTier::Standard),
            "Balanced GPT-4o model",
            "High-quality interviews with balanced performance",
        );
        registry.register(
            Provider::OpenAi,
            "gpt-4o-mini-2024-07-18",
            chat(16_384, QualityTier::Economy),
            "Smaller GPT-4o variant",
            "Faster generation with good quality",
        );
        registry.register(
            Provider::OpenAi,
            "o1-2024-12-17",
            reasoning(100_000, QualityTier::Premium),
            "Optimized for reasoning",
            "Interviews requiring deep analytical thinking",
        );
        registry.register(
            Provider::OpenAi,
            "o3-mini-2025-01-31",
            reasoning(100_000, QualityTier::Standard),
            "Compact but powerful model",
            "Efficient generation with good reasoning",
        );

        // Anthropic
        registry.register(
            Provider::Anthropic,
            "claude-3-7-sonnet-20250219",
            chat(8_192, QualityTier::Premium),
            "Latest Claude 3.7 Sonnet model",
            "Premium quality interviews with nuanced responses",
        );
        registry.register(
            Provider::Anthropic,
            "claude-3-5-sonnet-20240620",
            chat(8_192, QualityTier::Standard),
            "Claude 3.5 Sonnet (June 2024)",
            "Well-balanced interviews with good detail",
        );
        registry.register(
            Provider::Anthropic,
            "claude-3-5-sonnet-20241022",
            chat(8_192, QualityTier::Standard),
            "Claude 3.5 Sonnet (October 2024)",
            "Updated Sonnet with improved capabilities",
        );
        registry.register(
            Provider::Anthropic,
            "claude-3-5-haiku-20241022",
            chat(8_192, QualityTier::Economy),
            "Claude 3.5 Haiku model",
            "Fast generation while maintaining quality",
        );
        registry.register(
            Provider::Anthropic,
            "claude-3-haiku-20240307",
            chat(4_096, QualityTier::Economy),
            "Claude 3 Haiku (cheapest option)",
            "Cost-effective interview generation",
        );

        // Google
        registry.register(
            Provider::Google,
            "gemini-2.0-flash",
            gemini(8_192, QualityTier::Standard),
            "Google's Gemini 2.0 Flash model",
            "High-quality responses with good speed",
        );
        registry.register(
            Provider::Google,
            "gemini-2.0-flash-lite",
            gemini(8_192, QualityTier::Economy),
            "Lighter version of Gemini 2.0 Flash",
            "Efficient processing for simpler interviews",
        );

        registry
    }

    fn register(
        &mut self,
        provider: Provider,
        model: &str,
        capabilities: ModelCapabilities,
        description: &str,
        best_for: &str,
    ) {
        self.index.insert(model.to_string(), self.entries.len());
        self.entries.push(ModelEntry {
            provider,
            model: model.to_string(),
            capabilities,
            description: description.to_string(),
            best_for: best_for.to_string(),
        });
    }

    /// Look up a model by id (aliases accepted).
    pub fn get(&self, model: &str) -> Option<&ModelEntry> {
        self.index
            .get(&normalize_model_id(model))
            .map(|&i| &self.entries[i])
    }

    /// Catalogue entry for display. Alias for [`Self::get`].
    pub fn describe(&self, model: &str) -> Option<&ModelEntry> {
        self.get(model)
    }

    /// All models for a provider, in catalogue order.
    pub fn models_for(&self, provider: Provider) -> Vec<&ModelEntry> {
        self.entries
            .iter()
            .filter(|e| e.provider == provider)
            .collect()
    }

    pub fn all(&self) -> &[ModelEntry] {
        &self.entries
    }

    /// Model used when none is configured.
    pub fn default_model(provider: Provider) -> &'static str {
        match provider {
            Provider::OpenAi => "gpt-4o-2024-08-06",
            Provider::Anthropic => "claude-3-7-sonnet-20250219",
            Provider::Google => "gemini-2.0-flash",
        }
    }

    /// Conservative capability record for a model the registry does not know.
    pub fn fallback_capabilities(provider: Provider, model: &str) -> ModelCapabilities {
        match provider {
            Provider::OpenAi if is_openai_reasoning_id(model) => {
                reasoning(FALLBACK_MAX_OUTPUT_TOKENS, QualityTier::Economy)
            }
            Provider::OpenAi if !is_openai_legacy_chat_id(model) => {
                openai_unknown(FALLBACK_MAX_OUTPUT_TOKENS, QualityTier::Economy)
            }
            Provider::OpenAi | Provider::Anthropic => {
                chat(FALLBACK_MAX_OUTPUT_TOKENS, QualityTier::Economy)
            }
            Provider::Google => gemini(FALLBACK_MAX_OUTPUT_TOKENS, QualityTier::Economy),
        }
    }

    /// Resolve the profile for a run.
    ///
    /// A known model registered under a different provider keeps the
    /// requested provider and falls back to conservative capabilities.
    pub fn resolve(&self, provider: Provider, model: &str) -> ProviderProfile {
        let canonical = normalize_model_id(model);
        match self.get(&canonical) {
            Some(entry) if entry.provider == provider => entry.profile(),
            _ => {
                warn!(
                    provider = %provider,
                    model = %canonical,
                    "Model not in registry, using conservative capabilities"
                );
                ProviderProfile::new(
                    provider,
                    canonical.clone(),
                    Self::fallback_capabilities(provider, &canonical),
                )
            }
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_twelve_models() {
        let registry = ModelRegistry::new();
        assert_eq!(registry.all().len(), 12);
        assert_eq!(registry.models_for(Provider::OpenAi).len(), 5);
        assert_eq!(registry.models_for(Provider::Anthropic).len(), 5);
        assert_eq!(registry.models_for(Provider::Google).len(), 2);
    }

    #[test]
    fn test_default_models_are_registered() {
        let registry = ModelRegistry::new();
        for provider in Provider::all() {
            let entry = registry.get(ModelRegistry::default_model(*provider)).unwrap();
            assert_eq!(entry.provider, *provider);
        }
    }

    #[test]
    fn test_reasoning_models_reject_temperature() {
        let registry = ModelRegistry::new();
        for id in ["o1-2024-12-17", "o3-mini-2025-01-31"] {
            let caps = &registry.get(id).unwrap().capabilities;
            assert!(!caps.accepts_temperature);
            assert_eq!(caps.reasoning_effort, Some(ReasoningEffort::Medium));
            assert_eq!(caps.token_field, TokenLimitField::MaxCompletionTokens);
        }
    }

    #[test]
    fn test_gemini_uses_max_output_tokens() {
        let registry = ModelRegistry::new();
        let caps = &registry.get("gemini-2.0-flash-lite").unwrap().capabilities;
        assert_eq!(caps.token_field, TokenLimitField::MaxOutputTokens);
        assert_eq!(caps.quality, QualityTier::Economy);
    }

    #[test]
    fn test_normalize_dashed_gemini_alias() {
        assert_eq!(normalize_model_id("gemini-2-0-flash"), "gemini-2.0-flash");
        assert_eq!(normalize_model_id("gemini-2-0-flash-lite"), "gemini-2.0-flash-lite");
        assert_eq!(normalize_model_id("gemini-2.0-flash"), "gemini-2.0-flash");
        assert_eq!(normalize_model_id("gemini-pro"), "gemini-pro");
        assert_eq!(normalize_model_id("gpt-4o-2024-08-06"), "gpt-4o-2024-08-06");
    }

    #[test]
    fn test_resolve_known_model() {
        let registry = ModelRegistry::new();
        let profile = registry.resolve(Provider::Anthropic, "claude-3-haiku-20240307");
        assert_eq!(profile.capabilities.max_output_tokens, 4_096);
        assert_eq!(profile.quality(), QualityTier::Economy);
    }

    #[test]
    fn test_resolve_unknown_model_is_conservative() {
        let registry = ModelRegistry::new();
        let profile = registry.resolve(Provider::OpenAi, "gpt-5-experimental");
        assert_eq!(profile.model, "gpt-5-experimental");
        assert_eq!(profile.capabilities.max_output_tokens, FALLBACK_MAX_OUTPUT_TOKENS);
        assert!(!profile.capabilities.accepts_temperature);
        assert_eq!(profile.capabilities.reasoning_effort, None);
        assert_eq!(
            profile.capabilities.token_field,
            TokenLimitField::MaxCompletionTokens
        );

        let profile = registry.resolve(Provider::OpenAi, "gpt-4o-2099-01-01");
        assert!(profile.capabilities.accepts_temperature);
        assert_eq!(profile.capabilities.token_field, TokenLimitField::MaxTokens);

        let profile = registry.resolve(Provider::OpenAi, "o4-mini");
        assert!(!profile.capabilities.accepts_temperature);
        assert_eq!(
            profile.capabilities.token_field,
            TokenLimitField::MaxCompletionTokens
        );
    }

    #[test]
    fn test_resolve_model_under_wrong_provider_falls_back() {
        let registry = ModelRegistry::new();
        let profile = registry.resolve(Provider::Google, "claude-3-7-sonnet-20250219");
        assert_eq!(profile.provider, Provider::Google);
        assert_eq!(profile.capabilities.token_field, TokenLimitField::MaxOutputTokens);
    }

    #[test]
    fn test_describe() {
        let registry = ModelRegistry::new();
        let entry = registry.describe("claude-3-haiku-20240307").unwrap();
        assert_eq!(entry.best_for, "Cost-effective interview generation");
        assert!(registry.describe("nope").is_none());
    }
}
