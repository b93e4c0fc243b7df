//! Error types for video generation and operation polling.

use std::time::Duration;

/// Maximum number of characters of a provider error body kept in messages.
const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Errors that can occur while generating or extending a video.
#[derive(Debug, thiserror::Error)]
pub enum VeoChainError {
    /// Credentials missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// HTTP-level rate limit hit while talking to the API.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay from the `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration is incomplete or still holds a placeholder.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operation finished with the provider's resource-exhausted code.
    #[error("operation throttled (code {code}): {message}")]
    Throttled {
        /// Provider status code (8).
        code: i32,
        /// Provider error message.
        message: String,
        /// Delay suggested by the provider. Reported only; backoff ignores it.
        retry_after: Option<Duration>,
    },

    /// The operation finished with a non-retryable provider error.
    #[error("operation failed (code {code}): {message}")]
    OperationFailed {
        /// Provider status code.
        code: i32,
        /// Provider error message.
        message: String,
    },

    /// Every output was removed by the provider's safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The operation completed with neither a result nor an error.
    #[error("operation completed but no result returned")]
    EmptyCompletion,

    /// All attempts ended in throttling.
    #[error("max retries exceeded after {attempts} attempts")]
    RetriesExhausted {
        /// Submissions made before giving up.
        attempts: u32,
    },

    /// Response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl VeoChainError {
    /// Returns true if the provider asked us to back off and try again.
    ///
    /// Only terminal throttling of an operation qualifies. Errors raised while
    /// submitting or refreshing an operation are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }

    /// Returns the provider's suggested retry delay, if it sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after, .. } | Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for video generation operations.
pub type Result<T> = std::result::Result<T, VeoChainError>;

/// Reads a `Retry-After` header given in whole seconds.
#[cfg_attr(not(feature = "vertex"), allow(dead_code))]
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Collapses whitespace and truncates a provider error body for display.
#[cfg_attr(not(feature = "vertex"), allow(dead_code))]
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_ERROR_MESSAGE_CHARS {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_is_retryable() {
        let throttled = VeoChainError::Throttled {
            code: 8,
            message: "quota".into(),
            retry_after: None,
        };
        assert!(throttled.is_retryable());

        assert!(!VeoChainError::RateLimited { retry_after: None }.is_retryable());
        assert!(!VeoChainError::Auth("bad token".into()).is_retryable());
        assert!(!VeoChainError::EmptyCompletion.is_retryable());
        assert!(!VeoChainError::OperationFailed {
            code: 3,
            message: "bad prompt".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let throttled = VeoChainError::Throttled {
            code: 8,
            message: "quota".into(),
            retry_after: Some(Duration::from_secs(12)),
        };
        assert_eq!(throttled.retry_after(), Some(Duration::from_secs(12)));

        let rate_limited = VeoChainError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(60)));

        assert_eq!(VeoChainError::EmptyCompletion.retry_after(), None);
    }

    #[test]
    fn test_error_display() {
        let err = VeoChainError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = VeoChainError::RetriesExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "max retries exceeded after 5 attempts");
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 42 "));
        assert_eq!(parse_retry_after(&headers), Some(42));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_sanitize_error_message() {
        assert_eq!(sanitize_error_message("  a\n\n b\tc "), "a b c");

        let long = "x".repeat(MAX_ERROR_MESSAGE_CHARS + 20);
        let sanitized = sanitize_error_message(&long);
        assert!(sanitized.ends_with("..."));
        assert_eq!(sanitized.chars().count(), MAX_ERROR_MESSAGE_CHARS + 3);
    }
}
