//! Centralized default constants for intersynth.
//!
//! Every crate reads its defaults from here instead of defining its own magic
//! numbers. Organized by domain area.

// =============================================================================
// RETRY / BACKOFF
// =============================================================================

/// Attempts per generation or analysis call before the slot is given up.
pub const MAX_ATTEMPTS: u32 = 3;

/// Attempts for category synthesis and the comprehensive report.
///
/// These tiers aggregate many earlier calls, so losing one costs more.
pub const SYNTHESIS_MAX_ATTEMPTS: u32 = 5;

/// First backoff delay in milliseconds. Doubles on every retry.
pub const RETRY_BASE_DELAY_MS: u64 = 5_000;

/// Upper bound on any single backoff delay in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 20_000;

/// Upper bound on the random jitter added to a backoff delay.
pub const RETRY_MAX_JITTER_MS: u64 = 1_000;

// =============================================================================
// RUN SHAPE
// =============================================================================

/// Smallest number of interviews per category a run accepts.
pub const MIN_INTERVIEWS_PER_CATEGORY: u8 = 1;

/// Largest number of interviews per category a run accepts.
pub const MAX_INTERVIEWS_PER_CATEGORY: u8 = 10;

/// Slots processed at once. 1 keeps quota consumption predictable.
pub const CONCURRENCY: usize = 1;

/// Upper bound on configured concurrency.
pub const MAX_CONCURRENCY: usize = 8;

/// Capacity of the pipeline event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// SYNTHESIS INPUT BOUNDS
// =============================================================================

/// Characters of each analysis fed into a category synthesis prompt.
pub const ANALYSIS_EXCERPT_CHARS: usize = 2_000;

/// Characters of each category synthesis fed into the report prompt.
pub const SYNTHESIS_EXCERPT_CHARS: usize = 3_000;

// =============================================================================
// PROVIDER HTTP
// =============================================================================

/// Request timeout for a single provider call, in seconds.
pub const PROVIDER_TIMEOUT_SECS: u64 = 300;

/// Sampling temperature for models that accept one.
pub const SAMPLING_TEMPERATURE: f32 = 0.7;

/// OpenAI API endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Anthropic API endpoint.
pub const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Google Gemini API endpoint.
pub const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
