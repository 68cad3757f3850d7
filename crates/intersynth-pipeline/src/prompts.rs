//! Prompt templates for generation and the three synthesis tiers.
//!
//! Section labels requested here are the ones [`crate::sections`] parses;
//! change both together.

use std::fmt::Write;

use intersynth_core::{
    defaults, BulletSection, CategorySynthesis, InterviewAnalysis, PersonaPair, RawInterview,
    ReportLength, ResearchArea, StakeholderCategory,
};

use crate::sections::excerpt;

fn research_focus() -> String {
    ResearchArea::all()
        .iter()
        .enumerate()
        .map(|(i, area)| format!("{}. {}", i + 1, area.focus()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for one synthetic interview transcript.
pub fn interview_prompt(pair: &PersonaPair, category: StakeholderCategory) -> String {
    let interviewer = &pair.interviewer;
    let stakeholder = &pair.stakeholder;

    let mut prompt = format!(
        "Create a realistic, detailed interview transcript between a researcher and a stakeholder \
         in the consulting industry about AI adoption and its impact.\n\n\
         INTERVIEWER: {} - {}\n\
         INTERVIEWEE: {} - {}\n\
         CONTEXT: This interview is part of a research study on AI in consulting. The interviewee \
         belongs to the {} stakeholder group.\n",
        interviewer.name,
        interviewer.role,
        stakeholder.name,
        stakeholder.role,
        category.label(),
    );

    if let Some(enriched) = &stakeholder.enriched {
        let _ = writeln!(prompt, "BACKGROUND: {}", enriched.persona_text.trim());
        if !enriched.labels.is_empty() {
            let _ = writeln!(prompt, "EXPERTISE: {}", enriched.labels.join(", "));
        }
        for (key, value) in &enriched.demographics {
            let _ = writeln!(prompt, "{}: {}", key.to_uppercase(), value);
        }
    }

    let _ = write!(
        prompt,
        "\nThe interview should explore:\n{}\n\n\
         Guidelines:\n\
         - Ask at least 5 substantive questions, for 5-7 question-and-answer exchanges\n\
         - Keep the interviewee's answers consistent with their role and stakeholder perspective\n\
         - Include specific examples, challenges and opinions\n\
         - Format every turn as the speaker's name followed by a colon, e.g. \"{}: ...\"\n\
         - Aim for 1000-1500 words\n\n\
         Write only the transcript, with no commentary before or after it.",
        research_focus(),
        interviewer.name,
    );
    prompt
}

/// Prompt for the tier-1 analysis of one interview.
pub fn analysis_prompt(interview: &RawInterview) -> String {
    let stakeholder = &interview.personas.stakeholder;
    format!(
        "Analyze the following interview transcript with {name} ({role}), a member of the \
         {category} stakeholder group.\n\n\
         TRANSCRIPT:\n{transcript}\n\n\
         Provide the analysis in exactly these numbered sections:\n\
         1. KEY POINTS: 3-5 main points as bullet points\n\
         2. NOTABLE QUOTES: 2-3 direct quotes from the interviewee as bullet points\n\
         3. AI ATTITUDES: the interviewee's overall attitude toward AI in consulting \
         (positive/negative/neutral/nuanced) with a short explanation\n\
         4. RQ1 INSIGHTS: {rq1}\n\
         5. RQ2 INSIGHTS: {rq2}\n\
         6. RQ3 INSIGHTS: {rq3}\n\
         7. RQ4 INSIGHTS: {rq4}\n\
         8. CONTRADICTIONS: tensions or inconsistencies in the interviewee's views\n\
         9. AUTHENTICITY ASSESSMENT: how realistic the interview is for this stakeholder\n\n\
         Start each section with its label exactly as written above.",
        name = stakeholder.name,
        role = stakeholder.role,
        category = interview.category().label(),
        transcript = interview.transcript.trim(),
        rq1 = ResearchArea::AiAdoption.question(),
        rq2 = ResearchArea::MarketTrends.question(),
        rq3 = ResearchArea::AutomationKnowledge.question(),
        rq4 = ResearchArea::EthicsRisk.question(),
    )
}

fn bullet_template() -> String {
    BulletSection::all()
        .iter()
        .map(|section| {
            let count = match section {
                BulletSection::KeyFindings => "3 bullets",
                _ => "2-3 bullets",
            };
            format!("### {}\n({}, each under 15 words)", section.heading(), count)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for the tier-2 synthesis of one category. Takes analysis excerpts,
/// never transcripts.
pub fn category_prompt(category: StakeholderCategory, analyses: &[&InterviewAnalysis]) -> String {
    let material = analyses
        .iter()
        .enumerate()
        .map(|(i, analysis)| {
            format!(
                "ANALYSIS {}:\n{}",
                i + 1,
                excerpt(&analysis.raw_text, defaults::ANALYSIS_EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are synthesizing {count} interview analyses from the {label} stakeholder group in a \
         research study on AI in consulting.\n\n\
         {material}\n\n\
         Respond with exactly these sections:\n\n\
         ## EXECUTIVE SUMMARY\n\
         A 400-500 word summary that synthesizes the key insights, identifies common themes, \
         highlights unique perspectives and explains the significance for the research \
         questions.\n\n\
         ## PRESENTATION BULLETS\n\
         {bullets}\n\n\
         ## CROSS-INTERVIEW PATTERNS\n\
         Agreements, disagreements and recurring concerns across the interviews.",
        count = analyses.len(),
        label = category.label(),
        material = material,
        bullets = bullet_template(),
    )
}

/// Prompt for the tier-3 comprehensive report.
pub fn report_prompt(syntheses: &[&CategorySynthesis], length: ReportLength) -> String {
    let material = syntheses
        .iter()
        .map(|synthesis| {
            format!(
                "SUMMARY FOR {}:\n{}",
                synthesis.category.label().to_uppercase(),
                excerpt(&synthesis.raw_text, defaults::SYNTHESIS_EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let words = length.section_words();
    format!(
        "You are writing the final report of a research study on AI in consulting, based on \
         summaries from {count} stakeholder groups.\n\n\
         {material}\n\n\
         Write the report in markdown with this structure:\n\n\
         # AI in Consulting: Comprehensive Research Report\n\n\
         ## Executive Summary\n\
         ({words} words) The most important findings across all stakeholder groups.\n\n\
         ## Key Findings for Presentation\n\
         3-4 concise bullets under each of: ### Overall Insights, ### AI Adoption Status, \
         ### Market Trends, ### Automation & Knowledge Effects, ### Ethical Considerations, \
         ### Recommendations for Consulting Firms\n\n\
         ## Stakeholder Perspectives\n\
         A short subsection per stakeholder group.\n\n\
         ## Cross-Category Analysis\n\
         ({words} words) Where the groups agree, where they diverge and why.\n\n\
         ## Research Questions Analysis\n\
         One subsection per research question:\n{questions}\n\n\
         ## Methodology\n\
         How the synthetic interviews were generated and analyzed.",
        count = syntheses.len(),
        material = material,
        words = words,
        questions = ResearchArea::all()
            .iter()
            .map(|area| format!("- {}: {}", area.rq(), area.question()))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
