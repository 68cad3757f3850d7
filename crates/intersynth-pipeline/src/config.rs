//! Pipeline run configuration.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `INTERSYNTH_CONCURRENCY` | `1` | Slots (and synthesis calls) in flight at once, 1-8 |
//! | `INTERSYNTH_MAX_ATTEMPTS` | `3` | Attempts per generation and analysis call |
//! | `INTERSYNTH_SYNTHESIS_MAX_ATTEMPTS` | `5` | Attempts per category and report call |
//! | `INTERSYNTH_RETRY_BASE_MS` | `5000` | First backoff delay |
//! | `INTERSYNTH_RETRY_MAX_MS` | `20000` | Backoff cap |
//! | `INTERSYNTH_RETRY_JITTER_MS` | `1000` | Maximum random jitter added to a backoff |
//! | `INTERSYNTH_EVENT_CAPACITY` | `256` | Broadcast buffer for pipeline events |

use std::str::FromStr;
use std::time::Duration;

use intersynth_core::{defaults, Error, Result};

use crate::resilience::RetryPolicy;

/// Tunables for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub concurrency: usize,
    /// Interview generation and tier-1 analysis.
    pub generation_policy: RetryPolicy,
    /// Tier-2 and tier-3 calls.
    pub synthesis_policy: RetryPolicy,
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::CONCURRENCY,
            generation_policy: RetryPolicy::standard(),
            synthesis_policy: RetryPolicy::synthesis(),
            event_capacity: defaults::EVENT_BUS_CAPACITY,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(concurrency) = env_parse("INTERSYNTH_CONCURRENCY") {
            config.concurrency = concurrency;
        }
        if let Some(attempts) = env_parse("INTERSYNTH_MAX_ATTEMPTS") {
            config.generation_policy = config.generation_policy.with_max_attempts(attempts);
        }
        if let Some(attempts) = env_parse("INTERSYNTH_SYNTHESIS_MAX_ATTEMPTS") {
            config.synthesis_policy = config.synthesis_policy.with_max_attempts(attempts);
        }
        if let Some(ms) = env_parse("INTERSYNTH_RETRY_BASE_MS") {
            config = config.with_backoff(|p| p.with_base_delay(Duration::from_millis(ms)));
        }
        if let Some(ms) = env_parse("INTERSYNTH_RETRY_MAX_MS") {
            config = config.with_backoff(|p| p.with_max_delay(Duration::from_millis(ms)));
        }
        if let Some(ms) = env_parse("INTERSYNTH_RETRY_JITTER_MS") {
            config = config.with_backoff(|p| p.with_max_jitter(Duration::from_millis(ms)));
        }
        if let Some(capacity) = env_parse("INTERSYNTH_EVENT_CAPACITY") {
            config.event_capacity = capacity;
        }
        config
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_generation_policy(mut self, policy: RetryPolicy) -> Self {
        self.generation_policy = policy;
        self
    }

    pub fn with_synthesis_policy(mut self, policy: RetryPolicy) -> Self {
        self.synthesis_policy = policy;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Apply the same backoff change to both policies.
    pub fn with_backoff(mut self, f: impl Fn(RetryPolicy) -> RetryPolicy) -> Self {
        self.generation_policy = f(self.generation_policy);
        self.synthesis_policy = f(self.synthesis_policy);
        self
    }

    /// Both policies without jitter.
    pub fn without_jitter(self) -> Self {
        self.with_backoff(RetryPolicy::without_jitter)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=defaults::MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(Error::Config(format!(
                "concurrency must be between 1 and {}, got {}",
                defaults::MAX_CONCURRENCY,
                self.concurrency
            )));
        }
        for (name, policy) in [
            ("generation", &self.generation_policy),
            ("synthesis", &self.synthesis_policy),
        ] {
            if policy.max_attempts == 0 {
                return Err(Error::Config(format!(
                    "{} policy needs at least one attempt",
                    name
                )));
            }
            if policy.base_delay > policy.max_delay {
                return Err(Error::Config(format!(
                    "{} backoff base {:?} exceeds cap {:?}",
                    name, policy.base_delay, policy.max_delay
                )));
            }
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event capacity must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.generation_policy.max_attempts, 3);
        assert_eq!(config.synthesis_policy.max_attempts, 5);
    }

    #[test]
    fn test_validate_rejects_bad_concurrency() {
        assert!(PipelineConfig::default().with_concurrency(0).validate().is_err());
        assert!(PipelineConfig::default().with_concurrency(9).validate().is_err());
        assert!(PipelineConfig::default().with_concurrency(8).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let config = PipelineConfig::default()
            .with_backoff(|p| p.with_base_delay(Duration::from_secs(30)));
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = PipelineConfig::default()
            .with_synthesis_policy(RetryPolicy::synthesis().with_max_attempts(0));
        match config.validate() {
            Err(Error::Config(message)) => assert!(message.contains("synthesis")),
            other => panic!("expected Config error, got {:?}", other),
        }
        assert!(PipelineConfig::default()
            .with_generation_policy(RetryPolicy::standard().with_max_attempts(1))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_without_jitter_applies_to_both() {
        let config = PipelineConfig::default().without_jitter();
        assert!(config.generation_policy.max_jitter.is_zero());
        assert!(config.synthesis_policy.max_jitter.is_zero());
    }
}
