//! Failure classification shared by every provider backend.
//!
//! Providers report errors differently (OpenAI and Anthropic use an error
//! `type`, Gemini a gRPC-style `status`), but all carry an HTTP status and a
//! message. Everything here reduces those to a [`FailureClass`] so nothing
//! provider-specific reaches the retry layer.

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use intersynth_core::{FailureClass, ProviderError};

/// Determine the failure class from HTTP status, provider error kind and message.
///
/// `error_kind` is the provider's error `type`, `status` or `code` string,
/// whichever it sends; an empty string when absent.
pub fn classify_response(status: u16, error_kind: &str, message: &str) -> FailureClass {
    let kind = error_kind.to_ascii_lowercase();
    let kind = kind.as_str();

    if matches!(status, 401 | 403)
        || matches!(
            kind,
            "authentication_error"
                | "permission_error"
                | "invalid_api_key"
                | "unauthenticated"
                | "permission_denied"
        )
        || message.contains("API key not valid")
    {
        return FailureClass::Unauthorized;
    }

    if status == 429
        || matches!(
            kind,
            "rate_limit_error" | "rate_limit_exceeded" | "insufficient_quota" | "resource_exhausted"
        )
    {
        return FailureClass::RateLimited;
    }

    // 529 is Anthropic's "overloaded".
    if matches!(status, 408 | 529)
        || (500..=599).contains(&status)
        || matches!(
            kind,
            "overloaded_error" | "api_error" | "server_error" | "unavailable" | "internal"
                | "deadline_exceeded"
        )
    {
        return FailureClass::Transient;
    }

    if matches!(status, 400 | 404 | 413 | 422)
        || matches!(
            kind,
            "invalid_request_error"
                | "not_found_error"
                | "model_not_found"
                | "invalid_argument"
                | "failed_precondition"
                | "not_found"
        )
    {
        return FailureClass::Invalid;
    }

    FailureClass::Unknown
}

/// Classify a transport-level failure (no HTTP response, or unreadable body).
pub fn classify_transport(err: &reqwest::Error) -> FailureClass {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        FailureClass::Transient
    } else if err.is_decode() || err.is_body() {
        FailureClass::Invalid
    } else {
        FailureClass::Unknown
    }
}

/// Build a [`ProviderError`] from a transport failure.
pub fn transport_error(err: reqwest::Error) -> ProviderError {
    ProviderError::new(classify_transport(&err), format!("Request failed: {}", err))
}

/// Error body shape common to OpenAI, Anthropic and Gemini.
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl ErrorDetail {
    fn kind(&self) -> String {
        if let Some(t) = self.error_type.as_deref().filter(|t| !t.is_empty()) {
            return t.to_string();
        }
        if let Some(s) = self.status.as_deref().filter(|s| !s.is_empty()) {
            return s.to_string();
        }
        match &self.code {
            Some(serde_json::Value::String(code)) => code.clone(),
            _ => String::new(),
        }
    }
}

/// Build a [`ProviderError`] from a non-success HTTP status and its body.
pub fn error_from_body(status: u16, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .unwrap_or_default();
    let kind = detail.kind();
    let message = detail
        .message
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());

    let class = classify_response(status, &kind, &message);
    debug!(status, error_kind = %kind, failure_class = %class, "Classified provider error");
    ProviderError::new(class, format!("HTTP {}: {}", status, message))
}

/// Check the status and decode a successful JSON body.
///
/// Non-success statuses are classified from the error body; a success body
/// that does not match `T` is `Invalid`.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(error_from_body(status.as_u16(), &body));
    }

    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::invalid(format!("Failed to parse response: {}", e)))
}

/// Reject an empty or whitespace-only completion.
pub(crate) fn non_empty(text: String) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        Err(ProviderError::invalid("Provider returned an empty response"))
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_401() {
        assert_eq!(
            classify_response(401, "invalid_api_key", ""),
            FailureClass::Unauthorized
        );
    }

    #[test]
    fn test_classify_429() {
        assert_eq!(
            classify_response(429, "rate_limit_exceeded", ""),
            FailureClass::RateLimited
        );
    }

    #[test]
    fn test_classify_quota_kind_without_429() {
        assert_eq!(
            classify_response(400, "insufficient_quota", ""),
            FailureClass::RateLimited
        );
    }

    #[test]
    fn test_classify_server_errors() {
        assert_eq!(classify_response(500, "server_error", ""), FailureClass::Transient);
        assert_eq!(classify_response(502, "", ""), FailureClass::Transient);
        assert_eq!(
            classify_response(529, "overloaded_error", ""),
            FailureClass::Transient
        );
    }

    #[test]
    fn test_classify_unsupported_parameter_is_invalid() {
        assert_eq!(
            classify_response(400, "invalid_request_error", "Unsupported parameter: 'max_tokens'"),
            FailureClass::Invalid
        );
    }

    #[test]
    fn test_classify_gemini_statuses() {
        assert_eq!(
            classify_response(429, "RESOURCE_EXHAUSTED", ""),
            FailureClass::RateLimited
        );
        assert_eq!(
            classify_response(400, "INVALID_ARGUMENT", "API key not valid. Please pass a valid API key."),
            FailureClass::Unauthorized
        );
        assert_eq!(classify_response(503, "UNAVAILABLE", ""), FailureClass::Transient);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify_response(418, "im_a_teapot", ""), FailureClass::Unknown);
    }

    #[test]
    fn test_error_from_openai_body() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#;
        let err = error_from_body(429, body);
        assert_eq!(err.class, FailureClass::RateLimited);
        assert!(err.message.contains("Rate limit reached"));
    }

    #[test]
    fn test_error_from_anthropic_body() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = error_from_body(529, body);
        assert_eq!(err.class, FailureClass::Transient);
        assert_eq!(err.message, "HTTP 529: Overloaded");
    }

    #[test]
    fn test_error_from_unparseable_body_uses_raw_text() {
        let err = error_from_body(503, "upstream connect error");
        assert_eq!(err.class, FailureClass::Transient);
        assert!(err.message.contains("upstream connect error"));
    }

    #[test]
    fn test_non_empty() {
        assert!(non_empty("text".into()).is_ok());
        assert_eq!(
            non_empty("  \n".into()).unwrap_err().class,
            FailureClass::Invalid
        );
    }
}
