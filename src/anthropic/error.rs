//! Error type for the Anthropic API client.

use thiserror::Error;

/// Errors returned while talking to the Anthropic Messages API.
///
/// Every variant is safe to retry from the caller's point of view: a
/// cover-letter request has no side effects beyond the returned text.
#[derive(Debug, Error)]
pub enum AnthropicError {
    /// HTTP 429. `retry_after_ms` comes from the `retry-after` header,
    /// defaulting to one second.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Any other non-success status, with the response body as message.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// No API key was configured.
    #[error("missing API key")]
    MissingApiKey,

    /// Transport failure (DNS, refused connection, client timeout, bad body).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl AnthropicError {
    /// Whether the failure is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnthropicError::RateLimited { .. } | AnthropicError::NetworkError(_) => true,
            AnthropicError::ApiError { status, .. } => *status >= 500,
            AnthropicError::MissingApiKey => false,
        }
    }
}
