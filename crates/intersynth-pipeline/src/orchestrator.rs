//! Run orchestration: plan slots, generate the corpus, synthesize, and
//! assemble the manifest.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use intersynth_core::{
    CategorySynthesis, ComprehensiveReport, Error, EventBus, EventEnvelope, GenerationBackend,
    InterviewAnalysis, PipelineEvent, RawInterview, Result, RunManifest, RunRequest, RunStatus,
    SkipRecord, SlotOutcome, SlotRecord, TokenBudgets,
};

use crate::config::PipelineConfig;
use crate::generation::{GenerationStage, SlotResult};
use crate::personas::{PersonaCatalog, PlannedSlot};
use crate::synthesis::{SynthesisOutput, SynthesisStage};

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunArtifacts {
    pub run_id: Uuid,
    /// Generated interviews in slot order.
    pub interviews: Vec<RawInterview>,
    pub analyses: Vec<InterviewAnalysis>,
    pub syntheses: Vec<CategorySynthesis>,
    pub report: Option<ComprehensiveReport>,
    pub skips: Vec<SkipRecord>,
    pub manifest: RunManifest,
    pub status: RunStatus,
}

/// Drives one backend through complete runs.
pub struct Pipeline {
    backend: Arc<dyn GenerationBackend>,
    config: PipelineConfig,
    events: EventBus,
}

impl Pipeline {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let events = EventBus::new(config.event_capacity);
        Ok(Self {
            backend,
            config,
            events,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Run `request` to completion or cancellation.
    ///
    /// Returns `Err` only when the run cannot start: an invalid request or a
    /// backend without credentials. Every later failure is recorded in the
    /// artifacts instead.
    pub async fn run(
        &self,
        request: RunRequest,
        catalog: &PersonaCatalog,
        cancel: CancellationToken,
    ) -> Result<RunArtifacts> {
        request.validate()?;

        let profile = self.backend.profile().clone();
        if !self.backend.has_credentials() {
            error!(provider = %profile.provider, "No API key configured, aborting run");
            return Err(Error::Aborted(format!(
                "no API key configured for {} (set {})",
                profile.provider,
                profile.provider.api_key_env()
            )));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let budgets = TokenBudgets::for_profile(&profile);
        let plan = catalog.plan(&request);

        info!(
            run_id = %run_id,
            provider = %profile.provider,
            model = %profile.model,
            quality = ?profile.quality(),
            slots = plan.len(),
            concurrency = self.config.concurrency,
            "Run started"
        );
        self.events.emit(
            run_id,
            PipelineEvent::RunStarted {
                run_id,
                slots: plan.len(),
            },
        );

        // Generation
        let generation = GenerationStage::new(
            self.backend.clone(),
            self.config.generation_policy,
            budgets.interview,
        );
        let results = self.generate_all(run_id, &generation, &plan, &cancel).await;

        let mut interviews = Vec::new();
        let mut skips = Vec::new();
        let mut slots = Vec::with_capacity(plan.len());
        for (planned, result) in plan.iter().zip(results) {
            let retry_count = result.retry_count();
            let outcome = match result {
                SlotResult::Generated(interview) => {
                    let outcome = SlotOutcome::Generated {
                        interview_id: interview.id,
                    };
                    interviews.push(interview);
                    outcome
                }
                SlotResult::Skipped(skip) => {
                    let outcome = SlotOutcome::Skipped {
                        reason: skip.reason,
                        message: skip.message.clone(),
                    };
                    skips.push(skip);
                    outcome
                }
                SlotResult::Abandoned { .. } => SlotOutcome::Abandoned,
            };
            slots.push(SlotRecord::new(planned.slot, &planned.personas, outcome, retry_count));
        }

        info!(
            run_id = %run_id,
            generated = interviews.len(),
            skipped = skips.len(),
            "Generation finished"
        );

        // Synthesis
        let synthesis = if cancel.is_cancelled() {
            SynthesisOutput {
                cancelled: true,
                ..Default::default()
            }
        } else {
            SynthesisStage::new(
                self.backend.clone(),
                budgets,
                self.config.generation_policy,
                self.config.synthesis_policy,
            )
            .with_concurrency(self.config.concurrency)
            .with_events(self.events.clone(), run_id)
            .run(&interviews, &request.categories, &cancel)
            .await
        };

        // A token tripped after the last call resolved does not downgrade the run.
        let abandoned = slots.iter().any(|s| s.outcome == SlotOutcome::Abandoned);
        let status = if synthesis.cancelled || abandoned {
            RunStatus::Cancelled {
                completed_slots: interviews.len(),
            }
        } else {
            RunStatus::finished(skips.len(), synthesis.failed_calls())
        };

        let manifest = RunManifest {
            run_id,
            started_at,
            finished_at: Utc::now(),
            provider: profile.provider,
            model: profile.model.clone(),
            quality: profile.quality(),
            request,
            slots,
            calls: synthesis.calls,
            status,
        };

        match status {
            RunStatus::Completed { .. } => info!(
                run_id = %run_id,
                status = ?status,
                duration_ms = start.elapsed().as_millis() as u64,
                "Run finished"
            ),
            _ => warn!(
                run_id = %run_id,
                status = ?status,
                duration_ms = start.elapsed().as_millis() as u64,
                "Run finished with degraded status"
            ),
        }
        self.events
            .emit(run_id, PipelineEvent::RunFinished { run_id, status });

        Ok(RunArtifacts {
            run_id,
            interviews,
            analyses: synthesis.analyses,
            syntheses: synthesis.syntheses,
            report: synthesis.report,
            skips,
            manifest,
            status,
        })
    }

    /// Generate every planned slot with bounded concurrency. Results come
    /// back in plan order.
    async fn generate_all(
        &self,
        run_id: Uuid,
        stage: &GenerationStage,
        plan: &[PlannedSlot],
        cancel: &CancellationToken,
    ) -> Vec<SlotResult> {
        let events = &self.events;
        let mut results: Vec<(usize, SlotResult)> = stream::iter(plan.iter().enumerate())
            .map(|(i, planned)| async move {
                events.emit(run_id, PipelineEvent::SlotStarted { slot: planned.slot });
                let result = stage.generate_interview(planned, cancel).await;
                match &result {
                    SlotResult::Generated(interview) => events.emit(
                        run_id,
                        PipelineEvent::InterviewGenerated {
                            slot: interview.slot,
                            interview_id: interview.id,
                            retry_count: interview.retry_count,
                        },
                    ),
                    SlotResult::Skipped(skip) => events.emit(
                        run_id,
                        PipelineEvent::SlotSkipped {
                            slot: skip.slot,
                            class: skip.reason.class(),
                        },
                    ),
                    SlotResult::Abandoned { .. } => {}
                }
                (i, result)
            })
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, result)| result).collect()
    }
}
