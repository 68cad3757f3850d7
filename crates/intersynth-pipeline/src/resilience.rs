//! Retry, backoff and cancellation around provider calls.
//!
//! Every generation and synthesis call goes through [`call_with_resilience`].
//! A call moves through `Attempting -> {Succeeded | Retrying | Exhausted}`:
//!
//! - `RateLimited`, `Transient` and `Unknown` failures back off and retry.
//! - `Invalid` and `Unauthorized` failures stop immediately.
//! - After `max_attempts` failures the call is exhausted.
//!
//! Backoff starts at `base_delay`, doubles per retry, is capped at
//! `max_delay`, and gets up to `max_jitter` added. Delays never decrease
//! within one call and never exceed the cap. Cancellation is observed before
//! each attempt, during the in-flight call and during the backoff sleep.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use intersynth_core::{defaults, FailureClass, FailureReason, ProviderError};

/// Attempt limit and backoff shape for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    /// Policy for interview generation and per-interview analysis.
    pub fn standard() -> Self {
        Self {
            max_attempts: defaults::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(defaults::RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(defaults::RETRY_MAX_DELAY_MS),
            max_jitter: Duration::from_millis(defaults::RETRY_MAX_JITTER_MS),
        }
    }

    /// Policy for category synthesis and the comprehensive report.
    pub fn synthesis() -> Self {
        Self {
            max_attempts: defaults::SYNTHESIS_MAX_ATTEMPTS,
            ..Self::standard()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    /// Same policy with jitter disabled, for reproducible timing.
    pub fn without_jitter(self) -> Self {
        self.with_max_jitter(Duration::ZERO)
    }

    /// Un-jittered delay before retry number `retry` (1-based).
    pub fn base_delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    fn sample_jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Per-call retry bookkeeping. Lives for one logical call.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    attempts: u32,
    last_class: Option<FailureClass>,
    last_delay: Duration,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_class(&self) -> Option<FailureClass> {
        self.last_class
    }

    pub fn last_delay(&self) -> Duration {
        self.last_delay
    }

    /// Retries so far: attempts beyond the first.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    fn begin_attempt(&mut self) {
        self.attempts += 1;
    }

    fn record_failure(&mut self, class: FailureClass) {
        self.last_class = Some(class);
    }

    /// Delay before the next attempt given `jitter`.
    ///
    /// Never smaller than the previous delay and never above the cap.
    pub fn next_delay(&mut self, policy: &RetryPolicy, jitter: Duration) -> Duration {
        let proposed = policy.base_delay_for(self.attempts.max(1)) + jitter;
        let delay = proposed.max(self.last_delay).min(policy.max_delay);
        self.last_delay = delay;
        delay
    }
}

/// A successful call and how many retries it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Resilient<T> {
    pub value: T,
    pub retries: u32,
}

/// Why a resilient call produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallFailure {
    /// Retryable failures on every allowed attempt.
    #[error("gave up after {attempts} attempts, last failure {class}: {message}")]
    Exhausted {
        class: FailureClass,
        message: String,
        attempts: u32,
    },

    /// A non-retryable failure.
    #[error("rejected on attempt {attempts} ({class}): {message}")]
    Rejected {
        class: FailureClass,
        message: String,
        attempts: u32,
    },

    /// The run was cancelled.
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl CallFailure {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Rejected { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// Retries performed before giving up.
    pub fn retry_count(&self) -> u32 {
        self.attempts().saturating_sub(1)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Failure reason for the manifest; `None` for cancellation.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Exhausted { class, .. } => Some(FailureReason::Exhausted(*class)),
            Self::Rejected { class, .. } => Some(FailureReason::Rejected(*class)),
            Self::Cancelled { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Exhausted { message, .. } | Self::Rejected { message, .. } => message.clone(),
            Self::Cancelled { .. } => "cancelled".to_string(),
        }
    }
}

/// Run `op` under `policy`, retrying retryable failures with backoff.
///
/// `subject` names the call in logs (slot id, interview id, category).
pub async fn call_with_resilience<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    subject: &str,
    mut op: F,
) -> Result<Resilient<T>, CallFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut state = RetryState::new();

    loop {
        if cancel.is_cancelled() {
            debug!(subject, attempt = state.attempts(), "Cancelled before attempt");
            return Err(CallFailure::Cancelled {
                attempts: state.attempts(),
            });
        }

        state.begin_attempt();
        trace!(subject, attempt = state.attempts(), "Attempting call");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(subject, attempt = state.attempts(), "Cancelled during call");
                return Err(CallFailure::Cancelled { attempts: state.attempts() });
            }
            result = op() => result,
        };

        let err = match result {
            Ok(value) => {
                if state.retries() > 0 {
                    debug!(subject, retries = state.retries(), "Call succeeded after retries");
                }
                return Ok(Resilient {
                    value,
                    retries: state.retries(),
                });
            }
            Err(err) => err,
        };

        state.record_failure(err.class);

        if !err.class.is_retryable() {
            warn!(
                subject,
                attempt = state.attempts(),
                failure_class = %err.class,
                error = %err.message,
                "Non-retryable failure"
            );
            return Err(CallFailure::Rejected {
                class: err.class,
                message: err.message,
                attempts: state.attempts(),
            });
        }

        if state.attempts() >= policy.max_attempts {
            warn!(
                subject,
                attempt = state.attempts(),
                failure_class = %err.class,
                error = %err.message,
                "Retries exhausted"
            );
            return Err(CallFailure::Exhausted {
                class: err.class,
                message: err.message,
                attempts: state.attempts(),
            });
        }

        let delay = state.next_delay(policy, policy.sample_jitter());
        warn!(
            subject,
            attempt = state.attempts(),
            max_attempts = policy.max_attempts,
            failure_class = %err.class,
            delay_ms = delay.as_millis() as u64,
            "Retry scheduled"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(subject, attempt = state.attempts(), "Cancelled during backoff");
                return Err(CallFailure::Cancelled { attempts: state.attempts() });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
