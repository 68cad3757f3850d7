//! OpenAI chat-completions backend.
//!
//! Handles both chat models (`max_tokens`, sampling temperature) and the
//! reasoning models (`max_completion_tokens`, `reasoning_effort`, no
//! temperature). Which shape is sent is decided by the profile's
//! [`intersynth_core::ModelCapabilities`], never by the model name.

mod backend;
mod types;

pub use backend::OpenAIBackend;
pub use types::*;
