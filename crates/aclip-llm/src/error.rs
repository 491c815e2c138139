//! Error types for LLM operations.

use thiserror::Error;

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors surfaced by the chat completion gateway.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network failure or provider 5xx, after the retry budget is spent.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// Provider 429, after the retry budget is spent.
    #[error("LLM provider rate limited")]
    RateLimited {
        /// Provider's retry-after hint, when supplied
        retry_after_ms: Option<u64>,
    },

    /// JSON was expected but could not be parsed even after one repair call.
    #[error("LLM returned unparseable output: {0}")]
    InvalidOutput(String),

    /// The call exceeded its timeout.
    #[error("LLM call timed out after {0} seconds")]
    Timeout(u64),

    /// The prompt exceeds the local context budget; rejected before any
    /// network traffic.
    #[error("prompt of {chars} chars exceeds the context budget of {budget}")]
    TooLarge { chars: usize, budget: usize },

    /// Missing or inconsistent provider configuration.
    #[error("LLM configuration error: {0}")]
    Config(String),
}

impl LlmError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn invalid_output(msg: impl Into<String>) -> Self {
        Self::InvalidOutput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the gateway should retry the call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Unavailable(_) | LlmError::RateLimited { .. } | LlmError::Timeout(_)
        )
    }

    /// Provider retry-after hint in milliseconds, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}
