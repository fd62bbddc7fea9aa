//! Provider-specific error types
//!
//! ProviderError는 외부 호출(LLM, 대상 HTTP) 관련 세부 에러를 관리합니다.
//! 코어에는 redwhisper_foundation::Error로 변환되어 전달됩니다.

use crate::retry::{RetryClassification, RetryableError};
use redwhisper_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors raised while talking to an external service
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// API key is missing or invalid
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// Server error (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Network error (connection failed, DNS, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid request (bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid response from API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not found or not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Quota exceeded
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Provider not configured
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RetryableError for ProviderError {
    fn classify(&self) -> RetryClassification {
        match self {
            ProviderError::RateLimited { retry_after_ms } => RetryClassification::RateLimited {
                retry_after_ms: *retry_after_ms,
            },

            // transient
            ProviderError::ServerError(_)
            | ProviderError::Timeout(_)
            | ProviderError::Network(_) => RetryClassification::Retry,

            ProviderError::Authentication(_)
            | ProviderError::InvalidRequest(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::ModelNotAvailable(_)
            | ProviderError::QuotaExceeded(_)
            | ProviderError::NotConfigured(_)
            | ProviderError::Unknown(_) => RetryClassification::NoRetry,
        }
    }
}

impl ProviderError {
    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(body.to_string()),
            429 => ProviderError::RateLimited {
                retry_after_ms: extract_retry_after(body),
            },
            400 => ProviderError::InvalidRequest(body.to_string()),
            404 => ProviderError::ModelNotAvailable(body.to_string()),
            408 | 504 => ProviderError::Timeout(body.to_string()),
            500..=599 => ProviderError::ServerError(body.to_string()),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Map a transport failure from reqwest
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// `error.retry_after` (seconds) from a JSON error body, in milliseconds
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let secs = json
        .get("error")
        .and_then(|e| e.get("retry_after"))
        .and_then(|v| v.as_f64())?;
    Some((secs * 1000.0) as u64)
}

// ============================================================================
// redwhisper_foundation::Error 변환
// ============================================================================

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(msg) => FoundationError::Config(msg),
            ProviderError::Timeout(msg) => FoundationError::Timeout(msg),
            ProviderError::Network(msg) => FoundationError::Http(msg),
            other => FoundationError::ExternalCall(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            ProviderError::from_http_status(401, "bad key"),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(503, "down"),
            ProviderError::ServerError(_)
        ));
        match ProviderError::from_http_status(429, r#"{"error":{"retry_after":1.5}}"#) {
            ProviderError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, Some(1500)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            ProviderError::ServerError("x".into()).classify(),
            RetryClassification::Retry
        );
        assert_eq!(
            ProviderError::Authentication("x".into()).classify(),
            RetryClassification::NoRetry
        );
    }

    #[test]
    fn test_into_foundation_error() {
        let err: FoundationError = ProviderError::ServerError("boom".into()).into();
        assert!(matches!(err, FoundationError::ExternalCall(_)));
        assert!(err.is_retryable());

        let err: FoundationError = ProviderError::NotConfigured("OPENAI_API_KEY".into()).into();
        assert!(matches!(err, FoundationError::Config(_)));
    }
}
