//! Data model shared by every intersynth crate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// PROVIDERS AND MODEL CAPABILITIES
// =============================================================================

/// LLM provider backing a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
}

impl Provider {
    pub fn all() -> &'static [Provider] {
        &[Provider::OpenAi, Provider::Anthropic, Provider::Google]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "google" | "gemini" => Ok(Self::Google),
            other => Err(Error::Config(format!("Unknown provider: {}", other))),
        }
    }
}

/// Reasoning-effort level for models that take one in place of temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Request field a backend expects the output-token limit under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLimitField {
    /// `max_tokens` (OpenAI chat models, Anthropic messages).
    MaxTokens,
    /// `max_completion_tokens` (OpenAI reasoning models).
    MaxCompletionTokens,
    /// `generationConfig.maxOutputTokens` (Gemini).
    MaxOutputTokens,
}

impl TokenLimitField {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::MaxTokens => "max_tokens",
            Self::MaxCompletionTokens => "max_completion_tokens",
            Self::MaxOutputTokens => "maxOutputTokens",
        }
    }
}

/// Relative speed/quality tier of a model. Drives token budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Fast and cheap; gets reduced report section targets.
    Economy,
    /// Balanced general-purpose models.
    Standard,
    /// Most capable models.
    Premium,
}

/// Which request parameters a model accepts, and how much it can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Hard ceiling on output tokens per call.
    pub max_output_tokens: u32,
    /// Whether the model accepts a sampling temperature.
    pub accepts_temperature: bool,
    /// Reasoning effort to send instead of temperature, if the model takes one.
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Field the output-token limit goes under.
    pub token_field: TokenLimitField,
    /// Speed/quality tier.
    pub quality: QualityTier,
}

impl ModelCapabilities {
    /// Clamp a requested token budget to what the model can emit.
    pub fn clamp_tokens(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_output_tokens.max(1))
    }
}

/// A resolved provider + model pair with its capability record.
///
/// Resolved once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider: Provider,
    pub model: String,
    pub capabilities: ModelCapabilities,
}

impl ProviderProfile {
    pub fn new(provider: Provider, model: impl Into<String>, capabilities: ModelCapabilities) -> Self {
        Self {
            provider,
            model: model.into(),
            capabilities,
        }
    }

    /// `provider/model`, as recorded in artifacts.
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }

    pub fn quality(&self) -> QualityTier {
        self.capabilities.quality
    }
}

// =============================================================================
// RESEARCH FRAME
// =============================================================================

/// Stakeholder group an interviewee belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeholderCategory {
    SeniorExecutives,
    AiSpecialists,
    MidLevelConsultants,
    Clients,
    TechnologyProviders,
    RegulatoryStakeholders,
    IndustryAnalysts,
}

impl StakeholderCategory {
    pub fn all() -> &'static [StakeholderCategory] {
        &[
            StakeholderCategory::SeniorExecutives,
            StakeholderCategory::AiSpecialists,
            StakeholderCategory::MidLevelConsultants,
            StakeholderCategory::Clients,
            StakeholderCategory::TechnologyProviders,
            StakeholderCategory::RegulatoryStakeholders,
            StakeholderCategory::IndustryAnalysts,
        ]
    }

    /// Stable snake_case key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::SeniorExecutives => "senior_executives",
            Self::AiSpecialists => "ai_specialists",
            Self::MidLevelConsultants => "mid_level_consultants",
            Self::Clients => "clients",
            Self::TechnologyProviders => "technology_providers",
            Self::RegulatoryStakeholders => "regulatory_stakeholders",
            Self::IndustryAnalysts => "industry_analysts",
        }
    }

    /// Lowercase words, for use inside prompts ("senior executives").
    pub fn label(&self) -> String {
        self.key().replace('_', " ")
    }

    /// Title-cased label ("Senior Executives").
    pub fn title(&self) -> String {
        self.key()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for StakeholderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StakeholderCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::all()
            .iter()
            .copied()
            .find(|c| c.key() == normalized)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown stakeholder category: {}", s)))
    }
}

/// The four fixed research questions every interview covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchArea {
    /// RQ1: state of AI adoption in consulting.
    AiAdoption,
    /// RQ2: consulting market trends.
    MarketTrends,
    /// RQ3: automation and knowledge internalisation by clients.
    AutomationKnowledge,
    /// RQ4: ethical risks and concerns.
    EthicsRisk,
}

impl ResearchArea {
    pub fn all() -> &'static [ResearchArea] {
        &[
            ResearchArea::AiAdoption,
            ResearchArea::MarketTrends,
            ResearchArea::AutomationKnowledge,
            ResearchArea::EthicsRisk,
        ]
    }

    /// "RQ1".."RQ4".
    pub fn rq(&self) -> &'static str {
        match self {
            Self::AiAdoption => "RQ1",
            Self::MarketTrends => "RQ2",
            Self::AutomationKnowledge => "RQ3",
            Self::EthicsRisk => "RQ4",
        }
    }

    pub fn question(&self) -> &'static str {
        match self {
            Self::AiAdoption => "How established is AI adoption within the consulting industry?",
            Self::MarketTrends => "What are the current trends in the consulting market?",
            Self::AutomationKnowledge => {
                "How does AI affect the business of consulting firms in terms of automation \
                 and internalisation of knowledge by clients?"
            }
            Self::EthicsRisk => {
                "What ethical risks and concerns are associated with integrating AI in consulting?"
            }
        }
    }

    /// Interview focus line.
    pub fn focus(&self) -> &'static str {
        match self {
            Self::AiAdoption => "Current state of AI adoption in consulting",
            Self::MarketTrends => "Market trends in the consulting industry related to AI",
            Self::AutomationKnowledge => {
                "Impact of AI on automation and knowledge management in consulting"
            }
            Self::EthicsRisk => "Ethical considerations and risks of AI in consulting",
        }
    }

    /// Heading used for presentation bullets.
    pub fn short_label(&self) -> &'static str {
        match self {
            Self::AiAdoption => "AI Adoption",
            Self::MarketTrends => "Market Trends",
            Self::AutomationKnowledge => "Automation & Knowledge",
            Self::EthicsRisk => "Ethical Considerations",
        }
    }
}

// =============================================================================
// PERSONAS AND SLOTS
// =============================================================================

/// Where stakeholder and interviewer personas come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaSource {
    /// The static persona table only.
    #[default]
    BuiltIn,
    /// Built-in personas enriched with cached external persona records.
    Enriched,
}

/// Attributes attached to a persona from an external persona cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedAttributes {
    /// Identifier of the record in the external dataset.
    pub source_id: String,
    /// Free-text persona description.
    pub persona_text: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub demographics: BTreeMap<String, String>,
}

/// One side of an interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched: Option<EnrichedAttributes>,
}

impl Persona {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            enriched: None,
        }
    }

    pub fn with_enrichment(mut self, enriched: EnrichedAttributes) -> Self {
        self.enriched = Some(enriched);
        self
    }

    fn is_senior(&self) -> bool {
        ["Senior", "Chief", "Head"]
            .iter()
            .any(|marker| self.role.contains(marker))
    }

    /// Coarse seniority derived from the role title.
    pub fn seniority(&self) -> &'static str {
        if self.is_senior() {
            "Senior"
        } else {
            "Mid-level"
        }
    }

    /// Coarse experience bracket derived from the role title.
    pub fn years_experience(&self) -> &'static str {
        if self.role.contains("Senior") || self.role.contains("Chief") {
            "15+"
        } else {
            "5-15"
        }
    }
}

/// Interviewer and stakeholder for one interview slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaPair {
    pub interviewer: Persona,
    pub stakeholder: Persona,
}

/// Position of a generation slot in the run plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId {
    pub category: StakeholderCategory,
    /// Zero-based index within the category.
    pub index: u8,
}

impl SlotId {
    pub fn new(category: StakeholderCategory, index: u8) -> Self {
        Self { category, index }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.index + 1)
    }
}

// =============================================================================
// GENERATED ARTIFACTS
// =============================================================================

/// A generated interview transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInterview {
    pub id: Uuid,
    pub slot: SlotId,
    pub personas: PersonaPair,
    pub transcript: String,
    pub generated_at: DateTime<Utc>,
    pub provider: Provider,
    pub model: String,
    pub retry_count: u32,
}

impl RawInterview {
    pub fn category(&self) -> StakeholderCategory {
        self.slot.category
    }
}

/// Interviewee's overall attitude toward AI in consulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attitude {
    Positive,
    Negative,
    Neutral,
    Nuanced,
}

/// How much of the requested analysis schema was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Every section parsed.
    Complete,
    /// The model answered but some sections are missing or malformed.
    Partial,
    /// The analysis call failed; only the reference to the interview remains.
    Failed,
}

/// Tier-1 analysis of exactly one [`RawInterview`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewAnalysis {
    pub interview_id: Uuid,
    pub category: StakeholderCategory,
    pub key_points: Vec<String>,
    pub notable_quotes: Vec<String>,
    pub attitude: Option<Attitude>,
    pub findings: BTreeMap<ResearchArea, String>,
    pub contradictions: Option<String>,
    pub authenticity: Option<String>,
    pub status: AnalysisStatus,
    /// Human-readable description of each missing or malformed section.
    pub gaps: Vec<String>,
    pub retry_count: u32,
    /// Model response as received.
    pub raw_text: String,
}

impl InterviewAnalysis {
    /// Placeholder for an interview whose analysis call failed.
    pub fn failed(interview: &RawInterview, reason: impl Into<String>, retry_count: u32) -> Self {
        Self {
            interview_id: interview.id,
            category: interview.category(),
            key_points: Vec::new(),
            notable_quotes: Vec::new(),
            attitude: None,
            findings: BTreeMap::new(),
            contradictions: None,
            authenticity: None,
            status: AnalysisStatus::Failed,
            gaps: vec![reason.into()],
            retry_count,
            raw_text: String::new(),
        }
    }

    /// Whether this analysis can feed a category synthesis.
    pub fn is_usable(&self) -> bool {
        self.status != AnalysisStatus::Failed
    }

    pub fn finding(&self, area: ResearchArea) -> Option<&str> {
        self.findings.get(&area).map(String::as_str)
    }
}

/// Presentation bullet group in a category synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletSection {
    KeyFindings,
    AiAdoption,
    MarketTrends,
    AutomationKnowledge,
    EthicsRisk,
}

impl BulletSection {
    pub fn all() -> &'static [BulletSection] {
        &[
            BulletSection::KeyFindings,
            BulletSection::AiAdoption,
            BulletSection::MarketTrends,
            BulletSection::AutomationKnowledge,
            BulletSection::EthicsRisk,
        ]
    }

    pub fn from_area(area: ResearchArea) -> Self {
        match area {
            ResearchArea::AiAdoption => Self::AiAdoption,
            ResearchArea::MarketTrends => Self::MarketTrends,
            ResearchArea::AutomationKnowledge => Self::AutomationKnowledge,
            ResearchArea::EthicsRisk => Self::EthicsRisk,
        }
    }

    pub fn area(&self) -> Option<ResearchArea> {
        match self {
            Self::KeyFindings => None,
            Self::AiAdoption => Some(ResearchArea::AiAdoption),
            Self::MarketTrends => Some(ResearchArea::MarketTrends),
            Self::AutomationKnowledge => Some(ResearchArea::AutomationKnowledge),
            Self::EthicsRisk => Some(ResearchArea::EthicsRisk),
        }
    }

    /// Heading as requested in the synthesis prompt.
    pub fn heading(&self) -> String {
        match self.area() {
            None => "Key Findings".to_string(),
            Some(area) => format!("{} ({})", area.short_label(), area.rq()),
        }
    }
}

/// Tier-2 synthesis over one stakeholder category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySynthesis {
    pub category: StakeholderCategory,
    /// Interviews whose analyses fed this synthesis.
    pub member_ids: Vec<Uuid>,
    pub executive_summary: String,
    pub bullets: BTreeMap<BulletSection, Vec<String>>,
    pub patterns: Option<String>,
    pub gaps: Vec<String>,
    pub retry_count: u32,
    pub raw_text: String,
}

/// How the comprehensive report was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOrigin {
    /// Written by the model from the category syntheses.
    Model,
    /// The report call failed; assembled from category executive summaries.
    MergedFallback,
}

/// Tier-3 cross-category report. One per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    pub categories: Vec<StakeholderCategory>,
    pub executive_summary: String,
    pub key_findings: String,
    pub stakeholder_perspectives: String,
    pub cross_category_analysis: String,
    pub research_questions: String,
    pub methodology: String,
    pub origin: ReportOrigin,
    pub gaps: Vec<String>,
    pub retry_count: u32,
    pub raw_text: String,
}

impl ComprehensiveReport {
    /// The "key findings for presentation" section, if the model produced one.
    pub fn presentation_bullets(&self) -> Option<&str> {
        let trimmed = self.key_findings.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// A generation slot that produced no interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub slot: SlotId,
    pub interviewer: String,
    pub stakeholder: String,
    pub reason: FailureReason,
    pub message: String,
    pub retry_count: u32,
}

/// Why a slot or call gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Retryable failures until the attempt limit; carries the last class.
    Exhausted(crate::error::FailureClass),
    /// Non-retryable failure on some attempt.
    Rejected(crate::error::FailureClass),
}

impl FailureReason {
    pub fn class(&self) -> crate::error::FailureClass {
        match self {
            Self::Exhausted(class) | Self::Rejected(class) => *class,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(class) => write!(f, "{} (retries exhausted)", class),
            Self::Rejected(class) => write!(f, "{}", class),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str_aliases() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("Claude".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert_eq!("gemini".parse::<Provider>().unwrap(), Provider::Google);
        assert!("mistral".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Provider::OpenAi).unwrap(), "\"openai\"");
    }

    #[test]
    fn test_category_keys_round_trip_through_from_str() {
        for category in StakeholderCategory::all() {
            assert_eq!(category.key().parse::<StakeholderCategory>().unwrap(), *category);
        }
        assert_eq!(
            "Senior Executives".parse::<StakeholderCategory>().unwrap(),
            StakeholderCategory::SeniorExecutives
        );
    }

    #[test]
    fn test_category_title() {
        assert_eq!(StakeholderCategory::MidLevelConsultants.title(), "Mid Level Consultants");
        assert_eq!(StakeholderCategory::AiSpecialists.label(), "ai specialists");
    }

    #[test]
    fn test_research_area_labels() {
        let rqs: Vec<&str> = ResearchArea::all().iter().map(|a| a.rq()).collect();
        assert_eq!(rqs, vec!["RQ1", "RQ2", "RQ3", "RQ4"]);
        assert_eq!(
            BulletSection::from_area(ResearchArea::EthicsRisk).heading(),
            "Ethical Considerations (RQ4)"
        );
        assert_eq!(BulletSection::KeyFindings.heading(), "Key Findings");
    }

    #[test]
    fn test_clamp_tokens() {
        let caps = ModelCapabilities {
            max_output_tokens: 4096,
            accepts_temperature: true,
            reasoning_effort: None,
            token_field: TokenLimitField::MaxTokens,
            quality: QualityTier::Economy,
        };
        assert_eq!(caps.clamp_tokens(8000), 4096);
        assert_eq!(caps.clamp_tokens(2000), 2000);
        assert_eq!(caps.clamp_tokens(0), 1);
    }

    #[test]
    fn test_persona_seniority() {
        let chief = Persona::new("Sarah Chen", "Chief Strategy Officer");
        assert_eq!(chief.seniority(), "Senior");
        assert_eq!(chief.years_experience(), "15+");

        let pm = Persona::new("Maria Garcia", "Project Manager for AI teams");
        assert_eq!(pm.seniority(), "Mid-level");
        assert_eq!(pm.years_experience(), "5-15");
    }

    #[test]
    fn test_slot_display_is_one_based() {
        let slot = SlotId::new(StakeholderCategory::Clients, 0);
        assert_eq!(slot.to_string(), "clients#1");
    }

    #[test]
    fn test_bullet_section_map_serializes_with_string_keys() {
        let mut bullets = BTreeMap::new();
        bullets.insert(BulletSection::MarketTrends, vec!["Demand is shifting".to_string()]);
        let json = serde_json::to_value(&bullets).unwrap();
        assert!(json.get("market_trends").is_some());
    }

    #[test]
    fn test_presentation_bullets_empty_is_none() {
        let report = ComprehensiveReport {
            categories: vec![StakeholderCategory::Clients],
            executive_summary: "summary".into(),
            key_findings: "  ".into(),
            stakeholder_perspectives: String::new(),
            cross_category_analysis: String::new(),
            research_questions: String::new(),
            methodology: String::new(),
            origin: ReportOrigin::Model,
            gaps: vec![],
            retry_count: 0,
            raw_text: String::new(),
        };
        assert!(report.presentation_bullets().is_none());
    }
}
