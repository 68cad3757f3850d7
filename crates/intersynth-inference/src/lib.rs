//! # intersynth-inference
//!
//! Provider adapters for the intersynth pipeline.
//!
//! This crate provides:
//! - One [`GenerationBackend`] implementation per provider (OpenAI,
//!   Anthropic, Google Gemini)
//! - The model catalogue and capability registry
//! - Failure classification from HTTP status and provider error bodies
//! - A scripted mock backend (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use intersynth_inference::{build_backend, AdapterConfig, ModelRegistry};
//! use intersynth_core::Provider;
//!
//! #[tokio::main]
//! async fn main() {
//!     let profile = ModelRegistry::new().resolve(Provider::Anthropic, "claude-3-5-haiku-20241022");
//!     let config = AdapterConfig::from_env(Provider::Anthropic);
//!     let backend = build_backend(profile, config).unwrap();
//!     let text = backend.generate("Say hello", 200).await.unwrap();
//!     println!("{}", text);
//! }
//! ```

pub mod anthropic;
pub mod config;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod profiles;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::sync::Arc;

use tracing::info;

// Re-export core types
pub use intersynth_core::*;

pub use anthropic::AnthropicBackend;
pub use config::AdapterConfig;
pub use error::{classify_response, classify_transport, error_from_body};
pub use gemini::GeminiBackend;
pub use openai::OpenAIBackend;
pub use profiles::{normalize_model_id, ModelEntry, ModelRegistry};

/// Construct the backend for `profile`.
///
/// Fails only on a config that does not match the profile's provider or
/// cannot build an HTTP client. A missing API key is not an error here; the
/// pipeline checks [`GenerationBackend::has_credentials`] before a run.
pub fn build_backend(
    profile: ProviderProfile,
    config: AdapterConfig,
) -> Result<Arc<dyn GenerationBackend>> {
    if config.provider != profile.provider {
        return Err(Error::Config(format!(
            "adapter config is for {} but the profile is for {}",
            config.provider, profile.provider
        )));
    }

    info!(
        provider = %profile.provider,
        model = %profile.model,
        quality = ?profile.quality(),
        "Building generation backend"
    );

    let backend: Arc<dyn GenerationBackend> = match profile.provider {
        Provider::OpenAi => Arc::new(OpenAIBackend::new(profile, config)?),
        Provider::Anthropic => Arc::new(AnthropicBackend::new(profile, config)?),
        Provider::Google => Arc::new(GeminiBackend::new(profile, config)?),
    };
    Ok(backend)
}
