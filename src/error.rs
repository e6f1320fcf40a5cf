use thiserror::Error;

pub use crate::anthropic::AnthropicError;

#[derive(Debug, Error)]
pub enum QuickApplyError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to record outcome for {job_id}: {message}")]
    Record { job_id: String, message: String },

    #[error("Anthropic API error: {0}")]
    Anthropic(#[from] AnthropicError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// A fault raised by the automation surface.
///
/// The class decides the recovery: transient faults are retried a bounded
/// number of times, fatal faults end the session, and a capability mismatch
/// skips the posting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomationFault {
    /// Timeout or element not found. Retryable.
    #[error("transient UI fault: {0}")]
    Transient(String),

    /// The automation session is no longer valid (e.g. signed out).
    #[error("automation session invalidated: {0}")]
    Fatal(String),

    /// The posting advertised quick apply but the opened surface has none.
    #[error("quick apply is not available on this posting")]
    CapabilityMismatch,
}

/// Failure of the listing surface itself, as opposed to a single posting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumerationError {
    #[error("listing page {page} unreachable after {attempts} attempts: {last}")]
    Unreachable {
        page: u32,
        attempts: u32,
        last: String,
    },

    #[error("automation session invalidated while listing: {0}")]
    Fatal(String),

    #[error("enumeration cancelled")]
    Cancelled,
}

/// Why a cover letter could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoverLetterFault {
    #[error("text generation timed out")]
    Timeout,

    #[error("text generation backend returned no text")]
    Empty,

    #[error("text generation unavailable: {0}")]
    Unavailable(String),

    #[error("text generation rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("text generation failed: {0}")]
    Backend(String),
}

impl From<AnthropicError> for CoverLetterFault {
    /// Failures another try cannot fix (bad key, 4xx) become `Unavailable`.
    fn from(err: AnthropicError) -> Self {
        if let AnthropicError::RateLimited { retry_after_ms } = err {
            return CoverLetterFault::RateLimited { retry_after_ms };
        }
        if err.is_retryable() {
            CoverLetterFault::Backend(err.to_string())
        } else {
            CoverLetterFault::Unavailable(err.to_string())
        }
    }
}
