//! Structured logging field names.
//!
//! All crates use these constants for structured `tracing` fields so a run's
//! log stream can be filtered by slot, tier or provider.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A tier failed after all retries; the run degrades |
//! | WARN  | Recoverable issue: retry scheduled, slot skipped, fallback applied |
//! | INFO  | Run lifecycle, stage completions |
//! | DEBUG | Request shaping decisions, budgets, parsed gaps |
//! | TRACE | Per-attempt detail, raw response sizes |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Run UUID.
pub const RUN_ID: &str = "run_id";

/// Subsystem originating the log event.
/// Values: "inference", "pipeline"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "generate", "analyze", "synthesize", "report"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Stakeholder category key.
pub const CATEGORY: &str = "category";

/// Slot index within its category.
pub const SLOT: &str = "slot";

/// Interview UUID.
pub const INTERVIEW_ID: &str = "interview_id";

/// Synthesis tier (1, 2 or 3).
pub const TIER: &str = "tier";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Provider name.
pub const PROVIDER: &str = "provider";

/// Model name used for inference.
pub const MODEL: &str = "model";

/// Token budget passed to the provider.
pub const MAX_TOKENS: &str = "max_tokens";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Retry fields ──────────────────────────────────────────────────────────

/// 1-based attempt number.
pub const ATTEMPT: &str = "attempt";

/// Failure classification of the last attempt.
pub const FAILURE_CLASS: &str = "failure_class";

/// Backoff delay before the next attempt, in milliseconds.
pub const DELAY_MS: &str = "delay_ms";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
