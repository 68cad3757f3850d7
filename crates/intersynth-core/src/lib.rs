//! # intersynth-core
//!
//! Core types, traits, and error taxonomy for the intersynth interview
//! generation and synthesis pipeline.
//!
//! This crate provides the data model every artifact is expressed in, the
//! [`GenerationBackend`] seam the provider adapters implement, and the
//! shared defaults and logging field names.

pub mod budget;
pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod manifest;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use budget::{ReportLength, TokenBudgets};
pub use error::{Error, FailureClass, ProviderError, Result};
pub use events::{EventBus, EventEnvelope, PipelineEvent};
pub use manifest::*;
pub use models::*;
pub use traits::*;
