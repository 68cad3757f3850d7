//! Scripted mock backend for deterministic testing.
//!
//! Responses are chosen by substring rules on the prompt. A rule can carry a
//! script of outcomes consumed one per matching call, so a test can say
//! "fail twice with RateLimited, then answer".
//!
//! ## Usage
//!
//! ```rust,ignore
//! use intersynth_inference::mock::{MockBackend, MockOutcome};
//! use intersynth_core::FailureClass;
//!
//! let backend = MockBackend::new()
//!     .with_default_response("Mock response")
//!     .with_script(
//!         "Sarah Chen",
//!         vec![MockOutcome::Fail(FailureClass::RateLimited), MockOutcome::respond("ok")],
//!     );
//! assert_eq!(backend.call_count(), 0);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use intersynth_core::{
    FailureClass, GenerationBackend, ModelCapabilities, Provider, ProviderError,
    ProviderProfile, QualityTier, TokenLimitField,
};

/// One scripted result.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    Respond(String),
    Fail(FailureClass),
}

impl MockOutcome {
    pub fn respond(text: impl Into<String>) -> Self {
        Self::Respond(text.into())
    }
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: String,
    pub max_tokens: u32,
}

struct Rule {
    needle: String,
    script: VecDeque<MockOutcome>,
    /// Used once the script is exhausted; `None` falls through to later rules.
    sticky: Option<MockOutcome>,
}

type Responder = dyn Fn(&str) -> String + Send + Sync;

/// Mock [`GenerationBackend`] with scripted outcomes and a call log.
#[derive(Clone)]
pub struct MockBackend {
    profile: ProviderProfile,
    rules: Arc<Mutex<Vec<Rule>>>,
    responder: Arc<Responder>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
    credentials: bool,
    latency: Duration,
}

/// Profile used when none is given: a Standard-tier chat model.
pub fn mock_profile() -> ProviderProfile {
    ProviderProfile::new(
        Provider::OpenAi,
        "mock-model",
        ModelCapabilities {
            max_output_tokens: 16_384,
            accepts_temperature: true,
            reasoning_effort: None,
            token_field: TokenLimitField::MaxTokens,
            quality: QualityTier::Standard,
        },
    )
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            profile: mock_profile(),
            rules: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(|_| "Mock response".to_string()),
            call_log: Arc::new(Mutex::new(Vec::new())),
            credentials: true,
            latency: Duration::ZERO,
        }
    }

    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Fixed response for prompts no rule claims.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        let response = response.into();
        self.responder = Arc::new(move |_| response.clone());
        self
    }

    /// Compute the response for prompts no rule claims.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.responder = Arc::new(responder);
        self
    }

    /// Outcomes consumed in order by prompts containing `needle`; afterwards
    /// those prompts fall through.
    pub fn with_script(self, needle: impl Into<String>, script: Vec<MockOutcome>) -> Self {
        lock(&self.rules).push(Rule {
            needle: needle.into(),
            script: script.into(),
            sticky: None,
        });
        self
    }

    /// Every prompt containing `needle` gets `outcome`.
    pub fn always(self, needle: impl Into<String>, outcome: MockOutcome) -> Self {
        lock(&self.rules).push(Rule {
            needle: needle.into(),
            script: VecDeque::new(),
            sticky: Some(outcome),
        });
        self
    }

    pub fn with_credentials(mut self, present: bool) -> Self {
        self.credentials = present;
        self
    }

    /// Simulated latency per call (uses tokio time, so it can be paused).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.call_log).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.call_log).len()
    }

    /// Number of recorded prompts containing `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        lock(&self.call_log)
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .count()
    }

    fn next_outcome(&self, prompt: &str) -> MockOutcome {
        let mut rules = lock(&self.rules);
        for rule in rules.iter_mut().filter(|r| prompt.contains(&r.needle)) {
            if let Some(outcome) = rule.script.pop_front() {
                return outcome;
            }
            if let Some(outcome) = &rule.sticky {
                return outcome.clone();
            }
        }
        MockOutcome::Respond((self.responder)(prompt))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        lock(&self.call_log).push(MockCall {
            prompt: prompt.to_string(),
            max_tokens,
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.next_outcome(prompt) {
            MockOutcome::Respond(text) => Ok(text),
            MockOutcome::Fail(class) => Err(ProviderError::new(class, "mock failure")),
        }
    }

    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    fn has_credentials(&self) -> bool {
        self.credentials
    }
}
