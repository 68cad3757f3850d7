//! Three-tier synthesis over the generated corpus.
//!
//! 1. Analysis: one call per interview, parsed into [`InterviewAnalysis`].
//! 2. Category synthesis: one call per category with at least one usable
//!    analysis, fed analysis excerpts.
//! 3. Report: one call over all category syntheses.
//!
//! Each tier starts only after the previous tier has fully resolved. No
//! synthesis failure aborts the run: a failed analysis is kept as a flagged
//! placeholder, a failed category is recorded and left out of the report,
//! and a failed report call is replaced by a merged fallback built from the
//! category syntheses.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use intersynth_core::{
    BulletSection, CallOutcome, CallRecord, CallTier, CategorySynthesis, ComprehensiveReport,
    EventBus, GenerationBackend, InterviewAnalysis, PipelineEvent, RawInterview, ReportOrigin,
    ResearchArea, StakeholderCategory, TokenBudgets,
};

use crate::prompts;
use crate::resilience::{call_with_resilience, CallFailure, RetryPolicy};
use crate::sections;

/// Everything the synthesis tiers produced.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOutput {
    /// One per interview, in corpus order.
    pub analyses: Vec<InterviewAnalysis>,
    /// One per successfully synthesized category, in request order.
    pub syntheses: Vec<CategorySynthesis>,
    pub report: Option<ComprehensiveReport>,
    pub calls: Vec<CallRecord>,
    /// Synthesis stopped early on cancellation.
    pub cancelled: bool,
}

impl SynthesisOutput {
    pub fn failed_calls(&self) -> usize {
        self.calls.iter().filter(|c| c.outcome.is_failed()).count()
    }
}

fn success_outcome(gaps: usize) -> CallOutcome {
    if gaps == 0 {
        CallOutcome::Complete
    } else {
        CallOutcome::Partial { gaps }
    }
}

/// Failure outcome, or `None` when the call was cancelled.
fn failure_outcome(failure: &CallFailure) -> Option<CallOutcome> {
    failure.reason().map(|reason| CallOutcome::Failed {
        reason,
        message: failure.message(),
    })
}

/// Runs the synthesis tiers against one backend.
pub struct SynthesisStage {
    backend: Arc<dyn GenerationBackend>,
    budgets: TokenBudgets,
    analysis_policy: RetryPolicy,
    synthesis_policy: RetryPolicy,
    concurrency: usize,
    events: EventBus,
    run_id: Uuid,
}

impl SynthesisStage {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        budgets: TokenBudgets,
        analysis_policy: RetryPolicy,
        synthesis_policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            budgets,
            analysis_policy,
            synthesis_policy,
            concurrency: 1,
            events: EventBus::default(),
            run_id: Uuid::nil(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Report progress on `events`, tagged with `run_id`.
    pub fn with_events(mut self, events: EventBus, run_id: Uuid) -> Self {
        self.events = events;
        self.run_id = run_id;
        self
    }

    fn emit(&self, event: PipelineEvent) {
        self.events.emit(self.run_id, event);
    }

    // =========================================================================
    // TIER 1
    // =========================================================================

    /// Analyze one interview. Returns `None` only when cancelled.
    pub async fn analyze_interview(
        &self,
        interview: &RawInterview,
        cancel: &CancellationToken,
    ) -> Option<(InterviewAnalysis, CallRecord)> {
        let prompt = prompts::analysis_prompt(interview);
        let subject = interview.id.to_string();
        let budget = self.budgets.analysis;

        let outcome = call_with_resilience(&self.analysis_policy, cancel, &subject, || {
            self.backend.generate(&prompt, budget)
        })
        .await;

        let (analysis, outcome) = match outcome {
            Ok(result) => {
                let analysis = sections::parse_analysis(interview, &result.value, result.retries);
                if !analysis.gaps.is_empty() {
                    debug!(
                        interview_id = %interview.id,
                        gaps = ?analysis.gaps,
                        "Analysis parsed with gaps"
                    );
                }
                let outcome = success_outcome(analysis.gaps.len());
                (analysis, outcome)
            }
            Err(failure) => {
                let outcome = failure_outcome(&failure)?;
                warn!(
                    interview_id = %interview.id,
                    category = %interview.category(),
                    error = %failure,
                    "Interview analysis failed, keeping placeholder"
                );
                let analysis = InterviewAnalysis::failed(
                    interview,
                    format!("analysis failed: {}", failure),
                    failure.retry_count(),
                );
                (analysis, outcome)
            }
        };

        self.emit(PipelineEvent::AnalysisCompleted {
            interview_id: interview.id,
            status: analysis.status,
        });
        let record = CallRecord {
            tier: CallTier::Analysis,
            subject,
            outcome,
            retry_count: analysis.retry_count,
        };
        Some((analysis, record))
    }

    // =========================================================================
    // TIER 2
    // =========================================================================

    /// Synthesize one category from its usable analyses, in the order
    /// given. The synthesis is `None` when the call failed; the whole result
    /// is `None` only when cancelled.
    pub async fn synthesize_category(
        &self,
        category: StakeholderCategory,
        analyses: &[&InterviewAnalysis],
        cancel: &CancellationToken,
    ) -> Option<(Option<CategorySynthesis>, CallRecord)> {
        let prompt = prompts::category_prompt(category, analyses);
        let member_ids: Vec<Uuid> = analyses.iter().map(|a| a.interview_id).collect();
        let budget = self.budgets.category;

        let outcome = call_with_resilience(&self.synthesis_policy, cancel, category.key(), || {
            self.backend.generate(&prompt, budget)
        })
        .await;

        let (synthesis, outcome, retry_count) = match outcome {
            Ok(result) => {
                let synthesis =
                    sections::parse_category(category, member_ids, &result.value, result.retries);
                info!(
                    category = %category,
                    members = synthesis.member_ids.len(),
                    gaps = synthesis.gaps.len(),
                    "Category synthesized"
                );
                self.emit(PipelineEvent::CategorySynthesized {
                    category,
                    members: synthesis.member_ids.len(),
                });
                let outcome = success_outcome(synthesis.gaps.len());
                (Some(synthesis), outcome, result.retries)
            }
            Err(failure) => {
                let outcome = failure_outcome(&failure)?;
                error!(
                    category = %category,
                    error = %failure,
                    "Category synthesis failed"
                );
                self.emit(PipelineEvent::CategoryFailed { category });
                (None, outcome, failure.retry_count())
            }
        };

        let record = CallRecord {
            tier: CallTier::Category,
            subject: category.key().to_string(),
            outcome,
            retry_count,
        };
        Some((synthesis, record))
    }

    // =========================================================================
    // TIER 3
    // =========================================================================

    /// Build the comprehensive report. A failed call yields the merged
    /// fallback; `None` only when cancelled.
    pub async fn build_report(
        &self,
        syntheses: &[CategorySynthesis],
        cancel: &CancellationToken,
    ) -> Option<(ComprehensiveReport, CallRecord)> {
        let inputs: Vec<&CategorySynthesis> = syntheses.iter().collect();
        let prompt = prompts::report_prompt(&inputs, self.budgets.report_length);
        let categories: Vec<StakeholderCategory> = syntheses.iter().map(|s| s.category).collect();
        let budget = self.budgets.report;

        let outcome = call_with_resilience(&self.synthesis_policy, cancel, "report", || {
            self.backend.generate(&prompt, budget)
        })
        .await;

        let (report, outcome) = match outcome {
            Ok(result) => {
                let report = sections::parse_report(categories, &result.value, result.retries);
                let outcome = success_outcome(report.gaps.len());
                (report, outcome)
            }
            Err(failure) => {
                let outcome = failure_outcome(&failure)?;
                error!(
                    error = %failure,
                    categories = syntheses.len(),
                    "Report call failed, assembling merged fallback"
                );
                (merged_report(syntheses, &failure), outcome)
            }
        };

        self.emit(PipelineEvent::ReportCompleted {
            origin: report.origin,
        });
        let record = CallRecord {
            tier: CallTier::Report,
            subject: "report".to_string(),
            outcome,
            retry_count: report.retry_count,
        };
        Some((report, record))
    }

    // =========================================================================
    // DRIVER
    // =========================================================================

    /// Run all three tiers over `interviews`. `categories` fixes the order of
    /// tier-2 calls; categories without usable analyses are not synthesized.
    pub async fn run(
        &self,
        interviews: &[RawInterview],
        categories: &[StakeholderCategory],
        cancel: &CancellationToken,
    ) -> SynthesisOutput {
        let mut output = SynthesisOutput::default();
        let start = Instant::now();

        // Tier 1
        self.emit(PipelineEvent::TierStarted {
            tier: CallTier::Analysis,
            calls: interviews.len(),
        });
        info!(
            subsystem = "pipeline",
            op = "analyze",
            tier = 1,
            calls = interviews.len(),
            "Starting interview analysis"
        );

        let mut analyzed: Vec<(usize, Option<(InterviewAnalysis, CallRecord)>)> =
            stream::iter(interviews.iter().enumerate())
                .map(|(i, interview)| async move {
                    (i, self.analyze_interview(interview, cancel).await)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        analyzed.sort_by_key(|(i, _)| *i);

        for (_, result) in analyzed {
            match result {
                Some((analysis, record)) => {
                    output.analyses.push(analysis);
                    output.calls.push(record);
                }
                None => output.cancelled = true,
            }
        }
        if output.cancelled {
            info!(analyses = output.analyses.len(), "Synthesis cancelled during analysis");
            return output;
        }

        // Tier 2
        let groups: Vec<(StakeholderCategory, Vec<&InterviewAnalysis>)> = categories
            .iter()
            .filter_map(|category| {
                let members: Vec<&InterviewAnalysis> = output
                    .analyses
                    .iter()
                    .filter(|a| a.category == *category && a.is_usable())
                    .collect();
                if members.is_empty() {
                    warn!(category = %category, "No usable analyses, category not synthesized");
                    None
                } else {
                    Some((*category, members))
                }
            })
            .collect();

        self.emit(PipelineEvent::TierStarted {
            tier: CallTier::Category,
            calls: groups.len(),
        });
        info!(
            subsystem = "pipeline",
            op = "synthesize",
            tier = 2,
            calls = groups.len(),
            "Starting category synthesis"
        );

        let mut synthesized: Vec<(usize, Option<(Option<CategorySynthesis>, CallRecord)>)> =
            stream::iter(groups.iter().enumerate())
                .map(|(i, (category, members))| async move {
                    (i, self.synthesize_category(*category, members, cancel).await)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        synthesized.sort_by_key(|(i, _)| *i);

        let mut cancelled = false;
        for (_, result) in synthesized {
            match result {
                Some((synthesis, record)) => {
                    output.syntheses.extend(synthesis);
                    output.calls.push(record);
                }
                None => cancelled = true,
            }
        }
        if cancelled {
            output.cancelled = true;
            info!(
                syntheses = output.syntheses.len(),
                "Synthesis cancelled during category tier"
            );
            return output;
        }

        // Tier 3
        if output.syntheses.is_empty() {
            warn!("No category syntheses, skipping comprehensive report");
            return output;
        }

        self.emit(PipelineEvent::TierStarted {
            tier: CallTier::Report,
            calls: 1,
        });
        info!(
            subsystem = "pipeline",
            op = "report",
            tier = 3,
            categories = output.syntheses.len(),
            "Building comprehensive report"
        );

        match self.build_report(&output.syntheses, cancel).await {
            Some((report, record)) => {
                output.report = Some(report);
                output.calls.push(record);
            }
            None => output.cancelled = true,
        }

        info!(
            analyses = output.analyses.len(),
            syntheses = output.syntheses.len(),
            failed_calls = output.failed_calls(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Synthesis complete"
        );
        output
    }
}

/// Report assembled from category syntheses when the report call fails.
pub fn merged_report(syntheses: &[CategorySynthesis], failure: &CallFailure) -> ComprehensiveReport {
    let mut executive_summary = Vec::new();
    let mut key_findings = Vec::new();
    let mut perspectives = Vec::new();

    for synthesis in syntheses {
        let title = synthesis.category.title();
        if !synthesis.executive_summary.is_empty() {
            executive_summary.push(format!("### {}\n{}", title, synthesis.executive_summary));
        }
        if let Some(bullets) = synthesis.bullets.get(&BulletSection::KeyFindings) {
            let lines: Vec<String> = bullets.iter().map(|b| format!("- {}", b)).collect();
            if !lines.is_empty() {
                key_findings.push(format!("### {}\n{}", title, lines.join("\n")));
            }
        }
        if let Some(patterns) = &synthesis.patterns {
            perspectives.push(format!("### {}\n{}", title, patterns));
        }
    }

    let research_questions = ResearchArea::all()
        .iter()
        .filter_map(|area| {
            let section = BulletSection::from_area(*area);
            let lines: Vec<String> = syntheses
                .iter()
                .flat_map(|s| {
                    let title = s.category.title();
                    s.bullets
                        .get(&section)
                        .into_iter()
                        .flatten()
                        .map(move |b| format!("- {}: {}", title, b))
                })
                .collect();
            (!lines.is_empty())
                .then(|| format!("### {}: {}\n{}", area.rq(), area.question(), lines.join("\n")))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    ComprehensiveReport {
        categories: syntheses.iter().map(|s| s.category).collect(),
        executive_summary: executive_summary.join("\n\n"),
        key_findings: key_findings.join("\n\n"),
        stakeholder_perspectives: perspectives.join("\n\n"),
        cross_category_analysis: String::new(),
        research_questions,
        methodology: format!(
            "Merged from {} category syntheses after the report call failed.",
            syntheses.len()
        ),
        origin: ReportOrigin::MergedFallback,
        gaps: vec![
            format!("report call failed: {}", failure),
            "cross-category analysis unavailable".to_string(),
        ],
        retry_count: failure.retry_count(),
        raw_text: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::Utc;
    use intersynth_core::{FailureClass, FailureReason, Persona, PersonaPair, Provider, SlotId};
    use intersynth_inference::mock::{MockBackend, MockOutcome};

    fn interview(category: StakeholderCategory, index: u8, name: &str) -> RawInterview {
        RawInterview {
            id: Uuid::new_v4(),
            slot: SlotId::new(category, index),
            personas: PersonaPair {
                interviewer: Persona::new("Dr. Maria Reynolds", "Researcher"),
                stakeholder: Persona::new(name, "Consultant"),
            },
            transcript: format!("Dr. Maria Reynolds: Hello\n{}: Hi", name),
            generated_at: Utc::now(),
            provider: Provider::OpenAi,
            model: "mock-model".into(),
            retry_count: 0,
        }
    }

    fn stage(backend: MockBackend) -> SynthesisStage {
        SynthesisStage::new(
            Arc::new(backend),
            TokenBudgets::for_quality(intersynth_core::QualityTier::Standard),
            RetryPolicy::standard().without_jitter(),
            RetryPolicy::synthesis().without_jitter(),
        )
    }

    fn synthesis(category: StakeholderCategory) -> CategorySynthesis {
        let mut bullets = BTreeMap::new();
        bullets.insert(BulletSection::KeyFindings, vec!["finding".to_string()]);
        bullets.insert(BulletSection::EthicsRisk, vec!["privacy".to_string()]);
        CategorySynthesis {
            category,
            member_ids: vec![],
            executive_summary: format!("{} summary", category.title()),
            bullets,
            patterns: None,
            gaps: vec![],
            retry_count: 0,
            raw_text: String::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_analysis_is_placeholder() {
        let backend = MockBackend::new().always(
            "transcript with Ann",
            MockOutcome::Fail(FailureClass::Invalid),
        );
        let iv = interview(StakeholderCategory::Clients, 0, "Ann");
        let (analysis, record) = stage(backend)
            .analyze_interview(&iv, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!analysis.is_usable());
        assert_eq!(analysis.interview_id, iv.id);
        assert!(matches!(
            record.outcome,
            CallOutcome::Failed {
                reason: FailureReason::Rejected(FailureClass::Invalid),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_uses_synthesis_policy() {
        let backend = MockBackend::new().always(
            "You are synthesizing",
            MockOutcome::Fail(FailureClass::Transient),
        );
        let iv = interview(StakeholderCategory::Clients, 0, "Ann");
        let analysis = sections::parse_analysis(&iv, "KEY POINTS:\n- a", 0);

        let (synthesis, record) = stage(backend.clone())
            .synthesize_category(
                StakeholderCategory::Clients,
                &[&analysis],
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(synthesis.is_none());
        assert!(record.outcome.is_failed());
        assert_eq!(record.retry_count, 4);
        assert_eq!(backend.calls_matching("You are synthesizing"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_skips_category_without_usable_analyses() {
        let backend = MockBackend::new()
            .always("transcript with Bob", MockOutcome::Fail(FailureClass::Invalid));
        let interviews = vec![
            interview(StakeholderCategory::Clients, 0, "Ann"),
            interview(StakeholderCategory::AiSpecialists, 0, "Bob"),
        ];
        let output = stage(backend.clone())
            .run(
                &interviews,
                &[StakeholderCategory::Clients, StakeholderCategory::AiSpecialists],
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(output.analyses.len(), 2);
        assert_eq!(output.syntheses.len(), 1);
        assert_eq!(output.syntheses[0].category, StakeholderCategory::Clients);
        assert_eq!(backend.calls_matching("You are synthesizing"), 1);
        assert!(output.report.is_some());
        assert_eq!(output.failed_calls(), 1);
    }

    fn canned(prompt: &str) -> String {
        if prompt.starts_with("Analyze the following") {
            "KEY POINTS:\n- a\n- b\n- c\nNOTABLE QUOTES:\n- \"q1\"\n- \"q2\"".to_string()
        } else if prompt.starts_with("You are synthesizing") {
            "## EXECUTIVE SUMMARY\nSteady.\n## PRESENTATION BULLETS\n### Key Findings\n- one"
                .to_string()
        } else {
            "## Executive Summary\nOverall.".to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerun_on_same_corpus_is_stable() {
        let backend = MockBackend::new().with_responder(canned);
        let interviews = vec![
            interview(StakeholderCategory::Clients, 0, "Ann"),
            interview(StakeholderCategory::AiSpecialists, 0, "Bob"),
            interview(StakeholderCategory::Clients, 1, "Cy"),
        ];
        let categories = [StakeholderCategory::Clients, StakeholderCategory::AiSpecialists];
        let stage = stage(backend).with_concurrency(3);

        let first = stage.run(&interviews, &categories, &CancellationToken::new()).await;
        let second = stage.run(&interviews, &categories, &CancellationToken::new()).await;

        assert_eq!(first.syntheses.len(), 2);
        assert_eq!(first.syntheses.len(), second.syntheses.len());
        for (a, b) in first.syntheses.iter().zip(&second.syntheses) {
            assert_eq!(a.category, b.category);
            assert_eq!(a.member_ids, b.member_ids);
            assert_eq!(a.raw_text, b.raw_text);
        }
        assert_eq!(
            first.syntheses[0].member_ids,
            vec![interviews[0].id, interviews[2].id]
        );
        assert_eq!(first.calls, second.calls);
        let first_ids: Vec<Uuid> = first.analyses.iter().map(|a| a.interview_id).collect();
        let second_ids: Vec<Uuid> = second.analyses.iter().map(|a| a.interview_id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_merged_report_collects_summaries() {
        let syntheses = vec![
            synthesis(StakeholderCategory::Clients),
            synthesis(StakeholderCategory::IndustryAnalysts),
        ];
        let failure = CallFailure::Exhausted {
            class: FailureClass::RateLimited,
            message: "429".into(),
            attempts: 5,
        };
        let report = merged_report(&syntheses, &failure);
        assert_eq!(report.origin, ReportOrigin::MergedFallback);
        assert_eq!(report.retry_count, 4);
        assert!(report.executive_summary.contains("### Clients\nClients summary"));
        assert!(report.executive_summary.contains("Industry Analysts summary"));
        assert!(report.key_findings.contains("- finding"));
        assert!(report.research_questions.contains("- Clients: privacy"));
        assert!(report.presentation_bullets().is_some());
        assert_eq!(report.categories.len(), 2);
    }
}
