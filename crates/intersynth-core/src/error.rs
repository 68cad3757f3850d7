//! Error types for intersynth.
//!
//! Two layers live here:
//!
//! - [`ProviderError`] is what a generation backend returns. Its
//!   [`FailureClass`] is the only thing the retry layer looks at.
//! - [`Error`] is the crate-wide error for everything else (configuration,
//!   run aborts, serialization).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using intersynth's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failed provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The provider throttled the request (HTTP 429, quota exceeded).
    RateLimited,
    /// Network fault or server-side error (timeouts, 5xx, overloaded).
    Transient,
    /// Malformed request or response (unsupported parameter, empty body).
    Invalid,
    /// Missing or rejected credentials.
    Unauthorized,
    /// Anything the backend could not place in another class.
    Unknown,
}

impl FailureClass {
    /// Whether a call failing with this class may be attempted again.
    ///
    /// `Unknown` is retried: the original failure is as likely to be a
    /// transport hiccup as a permanent fault, and retries are bounded.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transient | Self::Unknown)
    }

    /// All classes, in declaration order.
    pub fn all() -> &'static [FailureClass] {
        &[
            FailureClass::RateLimited,
            FailureClass::Transient,
            FailureClass::Invalid,
            FailureClass::Unauthorized,
            FailureClass::Unknown,
        ]
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "RateLimited"),
            Self::Transient => write!(f, "Transient"),
            Self::Invalid => write!(f, "Invalid"),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Error returned by a generation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{class}: {message}")]
pub struct ProviderError {
    pub class: FailureClass,
    pub message: String,
}

impl ProviderError {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FailureClass::RateLimited, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Transient, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Invalid, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Unauthorized, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Unknown, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.class.is_retryable()
    }
}

/// Core error type for intersynth operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A provider call failed and was not recovered
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The run was refused before any slot was attempted
    #[error("Run aborted: {0}")]
    Aborted(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP client construction or transport failure outside a provider call
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
