//! Interview generation stage: one resilient provider call per slot.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use intersynth_core::{GenerationBackend, RawInterview, SkipRecord, SlotId};

use crate::personas::PlannedSlot;
use crate::prompts;
use crate::resilience::{call_with_resilience, RetryPolicy};

/// What became of one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotResult {
    Generated(RawInterview),
    Skipped(SkipRecord),
    /// Cancelled before an interview was produced.
    Abandoned { slot: SlotId, retry_count: u32 },
}

impl SlotResult {
    pub fn slot(&self) -> SlotId {
        match self {
            Self::Generated(interview) => interview.slot,
            Self::Skipped(skip) => skip.slot,
            Self::Abandoned { slot, .. } => *slot,
        }
    }

    pub fn retry_count(&self) -> u32 {
        match self {
            Self::Generated(interview) => interview.retry_count,
            Self::Skipped(skip) => skip.retry_count,
            Self::Abandoned { retry_count, .. } => *retry_count,
        }
    }
}

/// Generates interview transcripts against one backend.
pub struct GenerationStage {
    backend: Arc<dyn GenerationBackend>,
    policy: RetryPolicy,
    max_tokens: u32,
}

impl GenerationStage {
    pub fn new(backend: Arc<dyn GenerationBackend>, policy: RetryPolicy, max_tokens: u32) -> Self {
        Self {
            backend,
            policy,
            max_tokens,
        }
    }

    /// Generate the interview for `planned`. Never fails: a terminal
    /// provider failure becomes a [`SkipRecord`] and the batch moves on.
    pub async fn generate_interview(
        &self,
        planned: &PlannedSlot,
        cancel: &CancellationToken,
    ) -> SlotResult {
        let slot = planned.slot;
        let pair = &planned.personas;
        let prompt = prompts::interview_prompt(pair, slot.category);
        let subject = slot.to_string();
        let start = Instant::now();

        debug!(
            slot = %slot,
            interviewer = %pair.interviewer.name,
            stakeholder = %pair.stakeholder.name,
            prompt_len = prompt.len(),
            max_tokens = self.max_tokens,
            "Generating interview"
        );

        let outcome = call_with_resilience(&self.policy, cancel, &subject, || {
            self.backend.generate(&prompt, self.max_tokens)
        })
        .await;

        match outcome {
            Ok(result) => {
                let profile = self.backend.profile();
                let interview = RawInterview {
                    id: Uuid::new_v4(),
                    slot,
                    personas: pair.clone(),
                    transcript: result.value,
                    generated_at: Utc::now(),
                    provider: profile.provider,
                    model: profile.model.clone(),
                    retry_count: result.retries,
                };
                info!(
                    slot = %slot,
                    interview_id = %interview.id,
                    response_len = interview.transcript.len(),
                    attempt = result.retries + 1,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Interview generated"
                );
                SlotResult::Generated(interview)
            }
            Err(failure) => match failure.reason() {
                Some(reason) => {
                    warn!(
                        slot = %slot,
                        stakeholder = %pair.stakeholder.name,
                        failure_class = %reason.class(),
                        attempt = failure.attempts(),
                        error = %failure.message(),
                        "Slot skipped"
                    );
                    SlotResult::Skipped(SkipRecord {
                        slot,
                        interviewer: pair.interviewer.name.clone(),
                        stakeholder: pair.stakeholder.name.clone(),
                        reason,
                        message: failure.message(),
                        retry_count: failure.retry_count(),
                    })
                }
                None => {
                    debug!(slot = %slot, "Slot abandoned on cancellation");
                    SlotResult::Abandoned {
                        slot,
                        retry_count: failure.retry_count(),
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personas::PersonaCatalog;
    use intersynth_core::{FailureClass, FailureReason, RunRequest, StakeholderCategory};
    use intersynth_inference::mock::{MockBackend, MockOutcome};

    fn planned() -> PlannedSlot {
        let request = RunRequest::new(vec![StakeholderCategory::AiSpecialists], 1);
        PersonaCatalog::builtin().plan(&request).remove(0)
    }

    fn stage(backend: MockBackend) -> GenerationStage {
        GenerationStage::new(
            Arc::new(backend),
            RetryPolicy::standard().without_jitter(),
            4000,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_generated_interview_carries_personas_and_model() {
        let backend = MockBackend::new().with_default_response("Dr. Maria Reynolds: Hi");
        let stage = stage(backend.clone());

        let result = stage
            .generate_interview(&planned(), &CancellationToken::new())
            .await;

        let SlotResult::Generated(interview) = result else {
            panic!("expected Generated, got {:?}", result);
        };
        assert_eq!(interview.personas.stakeholder.name, "Dr. Alex Kumar");
        assert_eq!(interview.model, "mock-model");
        assert_eq!(interview.retry_count, 0);
        assert_eq!(backend.calls()[0].max_tokens, 4000);
        assert!(backend.calls()[0].prompt.contains("INTERVIEWEE: Dr. Alex Kumar"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_from_rate_limits() {
        let backend = MockBackend::new().with_script(
            "INTERVIEWEE: Dr. Alex Kumar",
            vec![
                MockOutcome::Fail(FailureClass::RateLimited),
                MockOutcome::Fail(FailureClass::RateLimited),
            ],
        );
        let result = stage(backend)
            .generate_interview(&planned(), &CancellationToken::new())
            .await;
        assert!(matches!(result, SlotResult::Generated(_)));
        assert_eq!(result.retry_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_skips_without_retry() {
        let backend =
            MockBackend::new().always("INTERVIEWEE", MockOutcome::Fail(FailureClass::Unauthorized));
        let result = stage(backend.clone())
            .generate_interview(&planned(), &CancellationToken::new())
            .await;

        let SlotResult::Skipped(skip) = result else {
            panic!("expected Skipped");
        };
        assert_eq!(skip.reason, FailureReason::Rejected(FailureClass::Unauthorized));
        assert_eq!(skip.retry_count, 0);
        assert_eq!(skip.stakeholder, "Dr. Alex Kumar");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_slot_is_abandoned() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let backend = MockBackend::new();
        let result = stage(backend.clone()).generate_interview(&planned(), &cancel).await;
        assert!(matches!(result, SlotResult::Abandoned { retry_count: 0, .. }));
        assert_eq!(backend.call_count(), 0);
    }
}
