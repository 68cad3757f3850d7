//! Persona catalogue and slot planning.
//!
//! The built-in table has four stakeholders per category and four
//! interviewers. Slots beyond the table reuse interviewers with a session
//! suffix and get generated "Additional" stakeholders. When a run asks for
//! enriched personas, stakeholders pick up attributes from a cached persona
//! dataset (FinePersonas-shaped JSON), matched to categories by label
//! keywords. A missing or empty cache falls back to the built-ins.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use intersynth_core::{
    EnrichedAttributes, Error, Persona, PersonaPair, PersonaSource, Result, RunRequest, SlotId,
    StakeholderCategory,
};

const INTERVIEWERS: &[(&str, &str)] = &[
    (
        "Dr. Maria Reynolds",
        "Experienced researcher specializing in AI and consulting practices",
    ),
    (
        "Dr. James Harrison",
        "Professor of Business Technology with focus on industry transformation",
    ),
    (
        "Dr. Sophia Lin",
        "Research Director at a technology think tank studying AI adoption",
    ),
    (
        "Dr. Marcus Wellington",
        "Academic specializing in organizational change and technology",
    ),
];

fn builtin_stakeholders(category: StakeholderCategory) -> &'static [(&'static str, &'static str)] {
    match category {
        StakeholderCategory::SeniorExecutives => &[
            ("Sarah Chen", "Chief Strategy Officer at a Fortune 500 consulting firm with 18 years of experience"),
            ("Michael Rodriguez", "CEO of a mid-sized consulting firm specializing in digital transformation"),
            ("Jennifer Park", "Managing Director at a top-tier consulting firm overseeing AI initiatives"),
            ("Thomas Wilson", "Global Head of Innovation at an international consulting conglomerate"),
        ],
        StakeholderCategory::AiSpecialists => &[
            ("Dr. Alex Kumar", "Head of AI Research at a consulting firm with a PhD in Machine Learning"),
            ("Emma Watson", "AI Ethics Lead with background in both technology and philosophy"),
            ("David Chen", "Chief AI Architect with extensive experience implementing enterprise solutions"),
            ("Sophia Miller", "AI Implementation Specialist focusing on practical applications in consulting"),
        ],
        StakeholderCategory::MidLevelConsultants => &[
            ("James Peterson", "Senior Consultant with 7 years of experience in AI-driven projects"),
            ("Maria Garcia", "Project Manager for AI implementation teams at a mid-tier firm"),
            ("Robert Kim", "Data Science Consultant bridging technical and business requirements"),
            ("Aisha Johnson", "Engagement Manager focusing on AI transformation projects"),
        ],
        StakeholderCategory::Clients => &[
            ("Elizabeth Taylor", "CFO at a manufacturing company using AI consulting services"),
            ("Richard Martinez", "CIO at a financial services firm evaluating AI implementations"),
            ("Susan Yamamoto", "COO at a healthcare provider working with AI consultants"),
            ("Christopher Adams", "VP of Strategy at a retail chain undergoing AI transformation"),
        ],
        StakeholderCategory::TechnologyProviders => &[
            ("Michelle Lee", "CEO of an AI platform company partnering with consulting firms"),
            ("Ryan Patel", "CTO of a software company developing tools for consultants"),
            ("Jessica Brown", "Product Director at an enterprise AI solutions provider"),
            ("Nathan Williams", "Partnership Lead at a major cloud and AI infrastructure company"),
        ],
        StakeholderCategory::RegulatoryStakeholders => &[
            ("Dr. Gregory Scott", "Former regulatory official now advising on AI compliance"),
            ("Amanda Chen", "Legal counsel specializing in AI and data regulation"),
            ("Jonathan Baker", "Director at an industry standards organization for AI"),
            ("Patricia Reynolds", "Ethics Board Member overseeing AI implementations in consulting"),
        ],
        StakeholderCategory::IndustryAnalysts => &[
            ("Dr. Caroline White", "Principal Analyst at a leading research firm covering AI in consulting"),
            ("Marcus Johnson", "Industry Researcher specializing in digital transformation trends"),
            ("Hannah Diaz", "Senior Analyst publishing reports on the consulting industry"),
            ("Rajiv Patel", "Market Intelligence Director with focus on technology adoption in services"),
        ],
    }
}

/// Label keywords that place a cached persona in a category.
pub fn category_keywords(category: StakeholderCategory) -> &'static [&'static str] {
    match category {
        StakeholderCategory::SeniorExecutives => &[
            "Business", "Management", "Leadership", "Executive", "CEO", "CFO", "Strategy",
        ],
        StakeholderCategory::AiSpecialists => &[
            "Artificial Intelligence",
            "Machine Learning",
            "Data Science",
            "Computer Science",
            "Programming",
            "Software Engineering",
        ],
        StakeholderCategory::MidLevelConsultants => &[
            "Consulting",
            "Business Analysis",
            "Project Management",
            "Strategy",
            "Professional Services",
        ],
        StakeholderCategory::Clients => {
            &["Business", "Corporate", "Industry", "Enterprise", "Operations"]
        }
        StakeholderCategory::TechnologyProviders => &[
            "Technology",
            "Software",
            "Information Technology",
            "Engineering",
            "Computer Science",
        ],
        StakeholderCategory::RegulatoryStakeholders => {
            &["Law", "Regulation", "Compliance", "Policy", "Government", "Legal"]
        }
        StakeholderCategory::IndustryAnalysts => &[
            "Research",
            "Analysis",
            "Market Research",
            "Industry",
            "Academic",
            "Professor",
        ],
    }
}

// =============================================================================
// ENRICHED PERSONA CACHE
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Text(String),
    Number(u64),
}

impl RecordId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// A record as found in the cache file. Labels come either as a list or as
/// a JSON-encoded string under `summary_label`.
#[derive(Debug, Deserialize)]
struct CacheRecord {
    id: RecordId,
    #[serde(alias = "persona")]
    persona_text: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    summary_label: Option<String>,
    #[serde(default)]
    demographics: BTreeMap<String, String>,
}

impl CacheRecord {
    fn into_attributes(self) -> EnrichedAttributes {
        let mut labels = self.labels;
        if labels.is_empty() {
            if let Some(encoded) = &self.summary_label {
                labels = serde_json::from_str(encoded).unwrap_or_default();
            }
        }
        EnrichedAttributes {
            source_id: self.id.into_string(),
            persona_text: self.persona_text,
            labels,
            demographics: self.demographics,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CacheFile {
    ByCategory(BTreeMap<String, Vec<CacheRecord>>),
    Flat(Vec<CacheRecord>),
}

fn matches_category(attributes: &EnrichedAttributes, category: StakeholderCategory) -> bool {
    let keywords = category_keywords(category);
    attributes.labels.iter().any(|label| {
        let label = label.to_lowercase();
        keywords
            .iter()
            .any(|keyword| label.contains(&keyword.to_lowercase()))
    })
}

/// Cached external personas, grouped by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedCache {
    by_category: BTreeMap<StakeholderCategory, Vec<EnrichedAttributes>>,
}

impl EnrichedCache {
    /// Parse a cache file.
    ///
    /// Accepts either an object keyed by category (`{"clients": [...]}`) or a
    /// flat list, which is distributed over categories by label keywords.
    /// Unknown category keys are skipped with a warning.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CacheFile = serde_json::from_str(json)?;
        let mut by_category: BTreeMap<StakeholderCategory, Vec<EnrichedAttributes>> =
            BTreeMap::new();

        match file {
            CacheFile::ByCategory(groups) => {
                for (key, records) in groups {
                    let category = match key.parse::<StakeholderCategory>() {
                        Ok(category) => category,
                        Err(_) => {
                            warn!(category = %key, "Skipping unknown category in persona cache");
                            continue;
                        }
                    };
                    by_category
                        .entry(category)
                        .or_default()
                        .extend(records.into_iter().map(CacheRecord::into_attributes));
                }
            }
            CacheFile::Flat(records) => {
                let records: Vec<EnrichedAttributes> =
                    records.into_iter().map(CacheRecord::into_attributes).collect();
                for category in StakeholderCategory::all() {
                    let matched: Vec<EnrichedAttributes> = records
                        .iter()
                        .filter(|r| matches_category(r, *category))
                        .cloned()
                        .collect();
                    if !matched.is_empty() {
                        by_category.insert(*category, matched);
                    }
                }
            }
        }

        by_category.retain(|_, records| !records.is_empty());
        debug!(
            categories = by_category.len(),
            records = by_category.values().map(Vec::len).sum::<usize>(),
            "Parsed persona cache"
        );
        Ok(Self { by_category })
    }

    /// Read a cache file. A missing file yields an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Persona cache not found, using built-in personas");
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "failed to read persona cache {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    pub fn records(&self, category: StakeholderCategory) -> &[EnrichedAttributes] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Record for the `index`-th stakeholder of `category`, cycling.
    pub fn pick(&self, category: StakeholderCategory, index: usize) -> Option<&EnrichedAttributes> {
        let records = self.records(category);
        (!records.is_empty()).then(|| &records[index % records.len()])
    }
}

// =============================================================================
// CATALOGUE AND PLANNING
// =============================================================================

/// A slot with its assigned personas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSlot {
    pub slot: SlotId,
    pub personas: PersonaPair,
}

/// Built-in personas plus an optional enriched cache.
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    enriched: Option<EnrichedCache>,
}

impl PersonaCatalog {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn with_enriched_cache(mut self, cache: EnrichedCache) -> Self {
        self.enriched = Some(cache);
        self
    }

    pub fn enriched_cache(&self) -> Option<&EnrichedCache> {
        self.enriched.as_ref()
    }

    /// Interviewer for the `index`-th slot of a category.
    pub fn interviewer(&self, index: usize) -> Persona {
        let (name, role) = INTERVIEWERS[index % INTERVIEWERS.len()];
        if index < INTERVIEWERS.len() {
            Persona::new(name, role)
        } else {
            let session = index / INTERVIEWERS.len() + 1;
            Persona::new(format!("{} (Session {})", name, session), role)
        }
    }

    /// Built-in stakeholder for the `index`-th slot of `category`.
    pub fn stakeholder(&self, category: StakeholderCategory, index: usize) -> Persona {
        match builtin_stakeholders(category).get(index) {
            Some((name, role)) => Persona::new(*name, *role),
            None => Persona::new(
                format!("Additional {} {}", category.label(), index + 1),
                format!(
                    "Expert in the {} sector with unique perspective {}",
                    category.label(),
                    index + 1
                ),
            ),
        }
    }

    /// Assign personas to every slot of `request`, categories in request
    /// order and indexes ascending.
    pub fn plan(&self, request: &RunRequest) -> Vec<PlannedSlot> {
        let cache = match (request.persona_source, &self.enriched) {
            (PersonaSource::Enriched, Some(cache)) if !cache.is_empty() => Some(cache),
            (PersonaSource::Enriched, _) => {
                info!("No enriched personas available, using built-in personas");
                None
            }
            (PersonaSource::BuiltIn, _) => None,
        };

        let mut planned = Vec::with_capacity(request.slot_count());
        for category in &request.categories {
            for index in 0..request.interviews_per_category {
                let i = index as usize;
                let mut stakeholder = self.stakeholder(*category, i);
                if let Some(attributes) = cache.and_then(|c| c.pick(*category, i)) {
                    stakeholder = stakeholder.with_enrichment(attributes.clone());
                }
                planned.push(PlannedSlot {
                    slot: SlotId::new(*category, index),
                    personas: PersonaPair {
                        interviewer: self.interviewer(i),
                        stakeholder,
                    },
                });
            }
        }
        planned
    }
}
