//! Token budgets per pipeline tier.
//!
//! Budgets scale with the model's [`QualityTier`] and are always clamped to
//! the model's output ceiling, so a budget never exceeds what the backend
//! accepts.
//!
//! | Quality  | Interview | Analysis | Category | Report | Report sections |
//! |----------|-----------|----------|----------|--------|-----------------|
//! | Economy  | 3000      | 2000     | 3000     | 4000   | 250-300 words   |
//! | Standard | 4000      | 3000     | 4000     | 6000   | 400-500 words   |
//! | Premium  | 5000      | 4000     | 5000     | 8000   | 400-500 words   |

use serde::{Deserialize, Serialize};

use crate::models::{ProviderProfile, QualityTier};

/// Target length of each comprehensive report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportLength {
    /// 250-300 words per section.
    Reduced,
    /// 400-500 words per section.
    Full,
}

impl ReportLength {
    /// Word range requested for each report section.
    pub fn section_words(&self) -> &'static str {
        match self {
            Self::Reduced => "250-300",
            Self::Full => "400-500",
        }
    }
}

/// Output-token budget for each kind of call in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudgets {
    pub interview: u32,
    pub analysis: u32,
    pub category: u32,
    pub report: u32,
    pub report_length: ReportLength,
}

impl TokenBudgets {
    /// Unclamped budgets for a quality tier.
    pub fn for_quality(quality: QualityTier) -> Self {
        match quality {
            QualityTier::Economy => Self {
                interview: 3_000,
                analysis: 2_000,
                category: 3_000,
                report: 4_000,
                report_length: ReportLength::Reduced,
            },
            QualityTier::Standard => Self {
                interview: 4_000,
                analysis: 3_000,
                category: 4_000,
                report: 6_000,
                report_length: ReportLength::Full,
            },
            QualityTier::Premium => Self {
                interview: 5_000,
                analysis: 4_000,
                category: 5_000,
                report: 8_000,
                report_length: ReportLength::Full,
            },
        }
    }

    /// Budgets for a resolved profile, clamped to its output ceiling.
    pub fn for_profile(profile: &ProviderProfile) -> Self {
        let caps = &profile.capabilities;
        let base = Self::for_quality(caps.quality);
        Self {
            interview: caps.clamp_tokens(base.interview),
            analysis: caps.clamp_tokens(base.analysis),
            category: caps.clamp_tokens(base.category),
            report: caps.clamp_tokens(base.report),
            report_length: base.report_length,
        }
    }
}
