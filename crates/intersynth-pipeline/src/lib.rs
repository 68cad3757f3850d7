//! # intersynth-pipeline
//!
//! Interview generation, hierarchical synthesis and run orchestration.
//!
//! A run plans one slot per (category, index), generates a synthetic
//! interview for each slot through a resilient provider call, then
//! synthesizes the corpus in three tiers: per-interview analysis, per-category
//! synthesis and one comprehensive report.
//!
//! # Example
//!
//! ```rust,no_run
//! use intersynth_inference::{build_backend, AdapterConfig, ModelRegistry};
//! use intersynth_core::{Provider, RunRequest};
//! use intersynth_pipeline::{PersonaCatalog, Pipeline, PipelineConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> intersynth_core::Result<()> {
//!     let profile = ModelRegistry::new().resolve(Provider::OpenAi, "gpt-4o-mini-2024-07-18");
//!     let backend = build_backend(profile, AdapterConfig::from_env(Provider::OpenAi))?;
//!     let pipeline = Pipeline::new(backend, PipelineConfig::from_env())?;
//!
//!     let artifacts = pipeline
//!         .run(RunRequest::all_categories(2), &PersonaCatalog::builtin(), CancellationToken::new())
//!         .await?;
//!     println!("{:?}", artifacts.status);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod generation;
pub mod orchestrator;
pub mod personas;
pub mod prompts;
pub mod resilience;
pub mod sections;
pub mod synthesis;

pub use config::PipelineConfig;
pub use generation::{GenerationStage, SlotResult};
pub use orchestrator::{Pipeline, RunArtifacts};
pub use personas::{EnrichedCache, PersonaCatalog, PlannedSlot};
pub use resilience::{call_with_resilience, CallFailure, Resilient, RetryPolicy, RetryState};
pub use synthesis::{merged_report, SynthesisOutput, SynthesisStage};
