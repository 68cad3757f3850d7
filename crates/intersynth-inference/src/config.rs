//! Provider adapter configuration.
//!
//! Credentials and endpoint are resolved once per run and handed to
//! [`crate::build_backend`] as an explicit value. No backend reads the
//! environment on its own.
//!
//! ## Environment Variables
//!
//! | Variable | Provider | Default | Description |
//! |----------|----------|---------|-------------|
//! | `OPENAI_API_KEY` | openai | (none) | API key |
//! | `ANTHROPIC_API_KEY` | anthropic | (none) | API key |
//! | `GOOGLE_API_KEY` | google | (none) | API key |
//! | `OPENAI_BASE_URL` | openai | `https://api.openai.com/v1` | Endpoint |
//! | `ANTHROPIC_BASE_URL` | anthropic | `https://api.anthropic.com/v1` | Endpoint |
//! | `GEMINI_BASE_URL` | google | `https://generativelanguage.googleapis.com/v1beta` | Endpoint |
//! | `INTERSYNTH_PROVIDER_TIMEOUT` | all | `300` | Request timeout in seconds |
//! | `INTERSYNTH_TEMPERATURE` | all | `0.7` | Sampling temperature, where accepted |

use std::fmt;
use std::time::Duration;

use reqwest::Client;

use intersynth_core::{defaults, Error, Provider, Result};

/// Connection settings for one provider.
#[derive(Clone)]
pub struct AdapterConfig {
    pub provider: Provider,
    /// API key; `None` means the run cannot start.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Sampling temperature for models that accept one.
    pub temperature: f32,
}

// Keys never go to logs.
impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Default endpoint for a provider.
pub fn default_base_url(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => defaults::OPENAI_URL,
        Provider::Anthropic => defaults::ANTHROPIC_URL,
        Provider::Google => defaults::GEMINI_URL,
    }
}

fn base_url_env(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "OPENAI_BASE_URL",
        Provider::Anthropic => "ANTHROPIC_BASE_URL",
        Provider::Google => "GEMINI_BASE_URL",
    }
}

impl AdapterConfig {
    /// Defaults for `provider`, with no API key.
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            api_key: None,
            base_url: default_base_url(provider).to_string(),
            timeout_secs: defaults::PROVIDER_TIMEOUT_SECS,
            temperature: defaults::SAMPLING_TEMPERATURE,
        }
    }

    /// Load configuration for `provider` from environment variables.
    pub fn from_env(provider: Provider) -> Self {
        let api_key = std::env::var(provider.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty());
        let base_url = std::env::var(base_url_env(provider))
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| default_base_url(provider).to_string());
        let timeout_secs = std::env::var("INTERSYNTH_PROVIDER_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::PROVIDER_TIMEOUT_SECS);
        let temperature = std::env::var("INTERSYNTH_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::SAMPLING_TEMPERATURE);

        Self {
            provider,
            api_key,
            base_url,
            timeout_secs,
            temperature,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Whether an API key is present.
    pub fn has_credentials(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "{} base URL must be http(s), got '{}'",
                self.provider, self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("provider timeout must be positive".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Endpoint URL with `path` appended.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// API key, or an empty string when absent. The provider then answers 401.
    pub(crate) fn key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    /// HTTP client with this config's timeout.
    pub(crate) fn http_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))
    }
}
