//! The provider seam.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmResult;
use crate::usage::TokenUsage;

/// One completed chat turn.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Raw text of the first candidate
    pub text: String,
    /// Token usage reported by the provider, or an estimate
    pub usage: TokenUsage,
}

/// A chat completion backend.
///
/// This is the only place provider-specific wire shapes appear; everything
/// above the gateway works with `(prompt, options) -> Completion`.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for log lines.
    fn name(&self) -> &'static str;

    /// Issue a single chat completion. Implementations map transport and
    /// status failures onto the gateway's error taxonomy and must not retry
    /// internally; the gateway owns the retry budget.
    async fn chat(&self, prompt: &str, timeout: Duration) -> LlmResult<ChatResponse>;
}
