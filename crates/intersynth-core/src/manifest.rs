//! Run request and audit manifest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{
    FailureReason, PersonaPair, PersonaSource, Provider, QualityTier, SlotId, StakeholderCategory,
};

/// What a run should produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Categories to interview, in run order.
    pub categories: Vec<StakeholderCategory>,
    /// Interviews generated per category (1-10).
    pub interviews_per_category: u8,
    #[serde(default)]
    pub persona_source: PersonaSource,
}

impl RunRequest {
    pub fn new(categories: Vec<StakeholderCategory>, interviews_per_category: u8) -> Self {
        Self {
            categories,
            interviews_per_category,
            persona_source: PersonaSource::BuiltIn,
        }
    }

    /// A request covering every category.
    pub fn all_categories(interviews_per_category: u8) -> Self {
        Self::new(StakeholderCategory::all().to_vec(), interviews_per_category)
    }

    pub fn with_persona_source(mut self, source: PersonaSource) -> Self {
        self.persona_source = source;
        self
    }

    /// Reject empty or duplicated category lists and out-of-range counts.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::InvalidInput(
                "at least one stakeholder category is required".to_string(),
            ));
        }
        for (i, category) in self.categories.iter().enumerate() {
            if self.categories[..i].contains(category) {
                return Err(Error::InvalidInput(format!(
                    "category listed more than once: {}",
                    category
                )));
            }
        }
        let range =
            defaults::MIN_INTERVIEWS_PER_CATEGORY..=defaults::MAX_INTERVIEWS_PER_CATEGORY;
        if !range.contains(&self.interviews_per_category) {
            return Err(Error::InvalidInput(format!(
                "interviews per category must be between {} and {}, got {}",
                defaults::MIN_INTERVIEWS_PER_CATEGORY,
                defaults::MAX_INTERVIEWS_PER_CATEGORY,
                self.interviews_per_category
            )));
        }
        Ok(())
    }

    /// Total number of generation slots this request plans.
    pub fn slot_count(&self) -> usize {
        self.categories.len() * self.interviews_per_category as usize
    }
}

/// Final state of one generation slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SlotOutcome {
    Generated { interview_id: Uuid },
    Skipped { reason: FailureReason, message: String },
    /// The run was cancelled before this slot finished.
    Abandoned,
}

/// Per-slot entry in the manifest: who was paired and what happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub slot: SlotId,
    pub interviewer: String,
    pub stakeholder: String,
    pub stakeholder_role: String,
    pub seniority: String,
    pub years_experience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_id: Option<String>,
    pub outcome: SlotOutcome,
    pub retry_count: u32,
}

impl SlotRecord {
    pub fn new(slot: SlotId, personas: &PersonaPair, outcome: SlotOutcome, retry_count: u32) -> Self {
        let stakeholder = &personas.stakeholder;
        Self {
            slot,
            interviewer: personas.interviewer.name.clone(),
            stakeholder: stakeholder.name.clone(),
            stakeholder_role: stakeholder.role.clone(),
            seniority: stakeholder.seniority().to_string(),
            years_experience: stakeholder.years_experience().to_string(),
            enrichment_id: stakeholder.enriched.as_ref().map(|e| e.source_id.clone()),
            outcome,
            retry_count,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.outcome, SlotOutcome::Generated { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, SlotOutcome::Skipped { .. })
    }
}

/// Synthesis tier a call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallTier {
    /// Tier 1: one call per interview.
    Analysis,
    /// Tier 2: one call per category.
    Category,
    /// Tier 3: the comprehensive report.
    Report,
}

impl CallTier {
    pub fn number(&self) -> u8 {
        match self {
            Self::Analysis => 1,
            Self::Category => 2,
            Self::Report => 3,
        }
    }
}

/// Result of one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    /// Every requested section parsed.
    Complete,
    /// The call succeeded but some sections were missing.
    Partial { gaps: usize },
    /// The call failed after retries; a placeholder or fallback was recorded.
    Failed { reason: FailureReason, message: String },
}

impl CallOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-call entry in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub tier: CallTier,
    /// Interview id, category key or "report".
    pub subject: String,
    pub outcome: CallOutcome,
    pub retry_count: u32,
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every tier ran; some slots may have been skipped.
    Completed { skipped: usize },
    /// At least one synthesis call failed after retries.
    PartialFailure { skipped: usize, failed_calls: usize },
    /// The run was cancelled; completed slots are kept.
    Cancelled { completed_slots: usize },
}

impl RunStatus {
    /// Status for a run that was not cancelled.
    pub fn finished(skipped: usize, failed_calls: usize) -> Self {
        if failed_calls == 0 {
            Self::Completed { skipped }
        } else {
            Self::PartialFailure {
                skipped,
                failed_calls,
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Audit trail for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub provider: Provider,
    pub model: String,
    pub quality: QualityTier,
    pub request: RunRequest,
    pub slots: Vec<SlotRecord>,
    pub calls: Vec<CallRecord>,
    pub status: RunStatus,
}

impl RunManifest {
    pub fn generated_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_generated()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_skipped()).count()
    }

    pub fn failed_calls(&self) -> usize {
        self.calls.iter().filter(|c| c.outcome.is_failed()).count()
    }

    pub fn calls_for(&self, tier: CallTier) -> impl Iterator<Item = &CallRecord> {
        self.calls.iter().filter(move |c| c.tier == tier)
    }
}
