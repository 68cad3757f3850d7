//! Best-effort parsing of model responses into the synthesis schemas.
//!
//! Models are asked for labelled sections but routinely vary the markup:
//! `## KEY POINTS`, `**1. Key Points:**`, `Key points (3-5):` all occur. A
//! line is a heading when, after stripping markdown hashes, bold markers and
//! a list number, it starts with one of a section's labels followed by
//! nothing, a colon or a parenthesis. A list number has to agree with the
//! section's position unless the label stands alone. The first heading for
//! a section wins; later repeats are kept as body text. Anything missing is
//! reported as a gap rather than an error.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use intersynth_core::{
    AnalysisStatus, Attitude, BulletSection, CategorySynthesis, ComprehensiveReport,
    InterviewAnalysis, RawInterview, ReportOrigin, ResearchArea, StakeholderCategory,
};

static HEADING_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:#{1,6}\s*)?(?:\*\*|__)?\s*(?:(\d{1,2})[.)]\s+)?(?:\*\*|__)?\s*")
        .expect("heading prefix pattern is valid")
});

static BULLET_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d{1,2}[.)])\s+(.+?)\s*$").expect("bullet pattern is valid")
});

const TRUNCATION_MARKER: &str = "...(truncated)";

/// A section the parser looks for, with the labels that introduce it.
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    pub key: &'static str,
    /// Upper-case labels, most specific first.
    pub labels: &'static [&'static str],
}

const fn spec(key: &'static str, labels: &'static [&'static str]) -> SectionSpec {
    SectionSpec { key, labels }
}

// Interview analysis
const KEY_POINTS: SectionSpec = spec("key_points", &["KEY POINTS", "MAIN POINTS"]);
const QUOTES: SectionSpec = spec("notable_quotes", &["NOTABLE QUOTES", "QUOTES"]);
const ATTITUDE: SectionSpec = spec(
    "attitude",
    &["AI ATTITUDES", "AI ATTITUDE", "ATTITUDES", "ATTITUDE"],
);
const RQ1: SectionSpec = spec("rq1", &["RQ1 INSIGHTS", "RQ1"]);
const RQ2: SectionSpec = spec("rq2", &["RQ2 INSIGHTS", "RQ2"]);
const RQ3: SectionSpec = spec("rq3", &["RQ3 INSIGHTS", "RQ3"]);
const RQ4: SectionSpec = spec("rq4", &["RQ4 INSIGHTS", "RQ4"]);
const CONTRADICTIONS: SectionSpec = spec("contradictions", &["CONTRADICTIONS", "TENSIONS"]);
const AUTHENTICITY: SectionSpec = spec(
    "authenticity",
    &["AUTHENTICITY ASSESSMENT", "AUTHENTICITY"],
);

const ANALYSIS_SECTIONS: &[SectionSpec] = &[
    KEY_POINTS,
    QUOTES,
    ATTITUDE,
    RQ1,
    RQ2,
    RQ3,
    RQ4,
    CONTRADICTIONS,
    AUTHENTICITY,
];

// Category synthesis
const EXECUTIVE_SUMMARY: SectionSpec = spec("executive_summary", &["EXECUTIVE SUMMARY"]);
const PRESENTATION_BULLETS: SectionSpec = spec(
    "presentation_bullets",
    &["PRESENTATION BULLETS", "PRESENTATION-READY BULLETS", "BULLET POINTS"],
);
const PATTERNS: SectionSpec = spec(
    "patterns",
    &["CROSS-INTERVIEW PATTERNS", "CROSS INTERVIEW PATTERNS", "PATTERNS"],
);

const CATEGORY_SECTIONS: &[SectionSpec] = &[EXECUTIVE_SUMMARY, PRESENTATION_BULLETS, PATTERNS];

const BULLET_KEY_FINDINGS: SectionSpec = spec("key_findings", &["KEY FINDINGS"]);
const BULLET_ADOPTION: SectionSpec = spec("ai_adoption", &["AI ADOPTION"]);
const BULLET_MARKET: SectionSpec = spec("market_trends", &["MARKET TRENDS"]);
const BULLET_AUTOMATION: SectionSpec = spec(
    "automation_knowledge",
    &["AUTOMATION & KNOWLEDGE", "AUTOMATION AND KNOWLEDGE", "AUTOMATION"],
);
const BULLET_ETHICS: SectionSpec = spec(
    "ethics_risk",
    &["ETHICAL CONSIDERATIONS", "ETHICS", "ETHICAL RISKS"],
);

const BULLET_SECTIONS: &[SectionSpec] = &[
    BULLET_KEY_FINDINGS,
    BULLET_ADOPTION,
    BULLET_MARKET,
    BULLET_AUTOMATION,
    BULLET_ETHICS,
];

// Comprehensive report
const REPORT_KEY_FINDINGS: SectionSpec = spec(
    "key_findings",
    &["KEY FINDINGS FOR PRESENTATION", "KEY FINDINGS"],
);
const STAKEHOLDER_PERSPECTIVES: SectionSpec =
    spec("stakeholder_perspectives", &["STAKEHOLDER PERSPECTIVES"]);
const CROSS_CATEGORY: SectionSpec = spec(
    "cross_category_analysis",
    &["CROSS-CATEGORY ANALYSIS", "CROSS CATEGORY ANALYSIS"],
);
const RESEARCH_QUESTIONS: SectionSpec = spec(
    "research_questions",
    &["RESEARCH QUESTIONS ANALYSIS", "RESEARCH QUESTIONS"],
);
const METHODOLOGY: SectionSpec = spec("methodology", &["METHODOLOGY"]);

const REPORT_SECTIONS: &[SectionSpec] = &[
    EXECUTIVE_SUMMARY,
    REPORT_KEY_FINDINGS,
    STAKEHOLDER_PERSPECTIVES,
    CROSS_CATEGORY,
    RESEARCH_QUESTIONS,
    METHODOLOGY,
];

fn area_spec(area: ResearchArea) -> SectionSpec {
    match area {
        ResearchArea::AiAdoption => RQ1,
        ResearchArea::MarketTrends => RQ2,
        ResearchArea::AutomationKnowledge => RQ3,
        ResearchArea::EthicsRisk => RQ4,
    }
}

fn bullet_spec(section: BulletSection) -> SectionSpec {
    match section {
        BulletSection::KeyFindings => BULLET_KEY_FINDINGS,
        BulletSection::AiAdoption => BULLET_ADOPTION,
        BulletSection::MarketTrends => BULLET_MARKET,
        BulletSection::AutomationKnowledge => BULLET_AUTOMATION,
        BulletSection::EthicsRisk => BULLET_ETHICS,
    }
}

// =============================================================================
// GENERIC SECTION SPLITTING
// =============================================================================

/// If `line` is a heading for one of `specs`, return the spec and any text
/// that follows the heading on the same line.
///
/// A list number must match the section's position in `specs` (1-based),
/// unless the line holds nothing but the label and a colon. Otherwise a
/// numbered item such as `2. Contradictions: ...` inside another section
/// would open that section early.
fn match_heading<'a>(line: &'a str, specs: &[SectionSpec]) -> Option<(SectionSpec, &'a str)> {
    let (prefix_len, number) = match HEADING_PREFIX.captures(line) {
        Some(caps) => (
            caps.get(0).map_or(0, |m| m.end()),
            caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()),
        ),
        None => (0, None),
    };
    let candidate = &line[prefix_len..];
    let upper = candidate.to_uppercase();

    for (position, spec) in specs.iter().enumerate() {
        let ordinal_matches = number.map_or(true, |n| n == position + 1);
        for label in spec.labels {
            // Upper-casing can change byte lengths outside ASCII; labels are ASCII.
            if !upper.starts_with(label) || !candidate.is_char_boundary(label.len()) {
                continue;
            }
            let rest = candidate[label.len()..]
                .trim_start_matches(|c: char| c == '*' || c == '_' || c.is_whitespace());
            let (after_label, inline) = if rest.starts_with('(') {
                let after_paren = rest.find(')').map_or("", |end| &rest[end + 1..]);
                (after_paren, inline_text(after_paren))
            } else if rest.is_empty() || rest.starts_with(':') {
                (rest, inline_text(rest))
            } else {
                continue;
            };
            if ordinal_matches || (inline.is_empty() && bare_colon(after_label)) {
                return Some((*spec, inline));
            }
        }
    }
    None
}

// `:` with nothing after it but markup.
fn bare_colon(rest: &str) -> bool {
    rest.trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace()) == ":"
}

fn inline_text(rest: &str) -> &str {
    rest.trim_start_matches(|c: char| c == '*' || c == '_' || c.is_whitespace())
        .trim_start_matches(':')
        .trim_start_matches(|c: char| c == '*' || c == '_' || c.is_whitespace())
        .trim_end()
}

/// Split `text` into the sections named by `specs`, keyed by
/// [`SectionSpec::key`]. Text before the first heading is dropped.
pub fn split_sections(text: &str, specs: &[SectionSpec]) -> BTreeMap<&'static str, String> {
    let mut sections: BTreeMap<&'static str, String> = BTreeMap::new();
    let mut current: Option<&'static str> = None;

    for line in text.lines() {
        if let Some((spec, inline)) = match_heading(line, specs) {
            if !sections.contains_key(spec.key) {
                sections.insert(spec.key, inline.to_string());
                current = Some(spec.key);
                continue;
            }
        }
        if let Some(key) = current {
            if let Some(body) = sections.get_mut(key) {
                if !body.is_empty() {
                    body.push('\n');
                }
                body.push_str(line);
            }
        }
    }

    for body in sections.values_mut() {
        *body = body.trim().to_string();
    }
    sections.retain(|_, body| !body.is_empty());
    sections
}

/// List items in a section body. Falls back to non-empty lines when the
/// body has no list markers.
pub fn bullet_items(body: &str) -> Vec<String> {
    let marked: Vec<String> = body
        .lines()
        .filter_map(|line| BULLET_ITEM.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| clean_item(m.as_str())))
        .filter(|item| !item.is_empty())
        .collect();
    if !marked.is_empty() {
        return marked;
    }
    body.lines()
        .map(clean_item)
        .filter(|item| !item.is_empty())
        .collect()
}

fn clean_item(item: &str) -> String {
    let trimmed = item.trim();
    let unbolded = trimmed
        .strip_prefix("**")
        .and_then(|s| s.strip_suffix("**"))
        .unwrap_or(trimmed);
    unbolded
        .trim_matches(|c: char| matches!(c, '"' | '\u{201c}' | '\u{201d}'))
        .trim()
        .to_string()
}

/// First `max_chars` characters of `text`, marked when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        None => trimmed.to_string(),
        Some((cut, _)) => format!("{}{}", &trimmed[..cut], TRUNCATION_MARKER),
    }
}

/// Attitude named earliest in `body`. "Mixed" reads as nuanced.
pub fn parse_attitude(body: &str) -> Option<Attitude> {
    let lower = body.to_lowercase();
    [
        ("positive", Attitude::Positive),
        ("negative", Attitude::Negative),
        ("neutral", Attitude::Neutral),
        ("nuanced", Attitude::Nuanced),
        ("mixed", Attitude::Nuanced),
    ]
    .into_iter()
    .filter_map(|(word, attitude)| lower.find(word).map(|pos| (pos, attitude)))
    .min_by_key(|(pos, _)| *pos)
    .map(|(_, attitude)| attitude)
}

fn count_gap(label: &str, found: usize, min: usize, max: usize) -> Option<String> {
    (found < min || found > max)
        .then(|| format!("expected {}-{} {}, found {}", min, max, label, found))
}

fn missing(label: &str) -> String {
    format!("missing section: {}", label)
}

// =============================================================================
// SCHEMA PARSERS
// =============================================================================

/// Parse a tier-1 analysis response for `interview`.
pub fn parse_analysis(interview: &RawInterview, raw: &str, retry_count: u32) -> InterviewAnalysis {
    let sections = split_sections(raw, ANALYSIS_SECTIONS);
    let mut gaps = Vec::new();

    let key_points = match sections.get(KEY_POINTS.key) {
        Some(body) => bullet_items(body),
        None => {
            gaps.push(missing("key points"));
            Vec::new()
        }
    };
    if !key_points.is_empty() {
        gaps.extend(count_gap("key points", key_points.len(), 3, 5));
    }

    let notable_quotes = match sections.get(QUOTES.key) {
        Some(body) => bullet_items(body),
        None => {
            gaps.push(missing("notable quotes"));
            Vec::new()
        }
    };
    if !notable_quotes.is_empty() {
        gaps.extend(count_gap("notable quotes", notable_quotes.len(), 2, 3));
    }

    let attitude = match sections.get(ATTITUDE.key) {
        Some(body) => {
            let parsed = parse_attitude(body);
            if parsed.is_none() {
                gaps.push("unrecognized AI attitude".to_string());
            }
            parsed
        }
        None => {
            gaps.push(missing("AI attitudes"));
            None
        }
    };

    let mut findings = BTreeMap::new();
    for area in ResearchArea::all() {
        match sections.get(area_spec(*area).key) {
            Some(body) => {
                findings.insert(*area, body.clone());
            }
            None => gaps.push(missing(&format!("{} insights", area.rq()))),
        }
    }

    let contradictions = sections.get(CONTRADICTIONS.key).cloned();
    if contradictions.is_none() {
        gaps.push(missing("contradictions"));
    }
    let authenticity = sections.get(AUTHENTICITY.key).cloned();
    if authenticity.is_none() {
        gaps.push(missing("authenticity assessment"));
    }

    let status = if gaps.is_empty() {
        AnalysisStatus::Complete
    } else {
        AnalysisStatus::Partial
    };

    InterviewAnalysis {
        interview_id: interview.id,
        category: interview.category(),
        key_points,
        notable_quotes,
        attitude,
        findings,
        contradictions,
        authenticity,
        status,
        gaps,
        retry_count,
        raw_text: raw.to_string(),
    }
}

/// Parse a tier-2 category synthesis response.
pub fn parse_category(
    category: StakeholderCategory,
    member_ids: Vec<Uuid>,
    raw: &str,
    retry_count: u32,
) -> CategorySynthesis {
    let sections = split_sections(raw, CATEGORY_SECTIONS);
    let mut gaps = Vec::new();

    let executive_summary = sections
        .get(EXECUTIVE_SUMMARY.key)
        .cloned()
        .unwrap_or_else(|| {
            gaps.push(missing("executive summary"));
            String::new()
        });

    let mut bullets = BTreeMap::new();
    match sections.get(PRESENTATION_BULLETS.key) {
        Some(body) => {
            let groups = split_sections(body, BULLET_SECTIONS);
            for section in BulletSection::all() {
                match groups.get(bullet_spec(*section).key) {
                    Some(group) => {
                        bullets.insert(*section, bullet_items(group));
                    }
                    None => gaps.push(missing(&format!("{} bullets", section.heading()))),
                }
            }
        }
        None => gaps.push(missing("presentation bullets")),
    }

    let patterns = sections.get(PATTERNS.key).cloned();
    if patterns.is_none() {
        gaps.push(missing("cross-interview patterns"));
    }

    CategorySynthesis {
        category,
        member_ids,
        executive_summary,
        bullets,
        patterns,
        gaps,
        retry_count,
        raw_text: raw.to_string(),
    }
}

/// Parse a tier-3 comprehensive report response.
pub fn parse_report(
    categories: Vec<StakeholderCategory>,
    raw: &str,
    retry_count: u32,
) -> ComprehensiveReport {
    let sections = split_sections(raw, REPORT_SECTIONS);
    let mut gaps = Vec::new();
    let mut take = |spec: SectionSpec, label: &str| match sections.get(spec.key) {
        Some(body) => body.clone(),
        None => {
            gaps.push(missing(label));
            String::new()
        }
    };

    let executive_summary = take(EXECUTIVE_SUMMARY, "executive summary");
    let key_findings = take(REPORT_KEY_FINDINGS, "key findings for presentation");
    let stakeholder_perspectives = take(STAKEHOLDER_PERSPECTIVES, "stakeholder perspectives");
    let cross_category_analysis = take(CROSS_CATEGORY, "cross-category analysis");
    let research_questions = take(RESEARCH_QUESTIONS, "research questions analysis");
    let methodology = take(METHODOLOGY, "methodology");

    ComprehensiveReport {
        categories,
        executive_summary,
        key_findings,
        stakeholder_perspectives,
        cross_category_analysis,
        research_questions,
        methodology,
        origin: ReportOrigin::Model,
        gaps,
        retry_count,
        raw_text: raw.to_string(),
    }
}

/// The "Key Findings for Presentation" block of a report, verbatim.
pub fn presentation_bullets(report_text: &str) -> Option<String> {
    split_sections(report_text, REPORT_SECTIONS).remove(REPORT_KEY_FINDINGS.key)
}
