//! Core traits for intersynth abstractions.
//!
//! These traits define the seams concrete implementations plug into, so the
//! pipeline can run against real providers or scripted test backends.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::ProviderProfile;

// =============================================================================
// GENERATION TRAITS
// =============================================================================

/// A text-generation backend bound to one [`ProviderProfile`].
///
/// Implementations shape the provider-specific request from the profile's
/// capabilities, normalize the response to plain text and classify failures
/// into a [`crate::error::FailureClass`]. Nothing provider-specific leaves
/// this boundary.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text for `prompt`, asking for at most `max_tokens` output
    /// tokens. The budget is clamped to the model's ceiling.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError>;

    /// The profile this backend was built for.
    fn profile(&self) -> &ProviderProfile;

    /// Whether the backend holds credentials it could send.
    ///
    /// Checked once before a run starts; a backend reporting `false` aborts
    /// the run before any slot is attempted.
    fn has_credentials(&self) -> bool {
        true
    }

    /// Model name being used.
    fn model_name(&self) -> &str {
        &self.profile().model
    }
}
