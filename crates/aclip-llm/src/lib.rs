//! Provider-agnostic chat completion gateway.
//!
//! Pipeline stages see only `complete(prompt, options) -> Completion`; the
//! two supported provider wire shapes (OpenAI-compatible chat completions
//! and Gemini `generateContent`) live behind [`ChatProvider`] and are chosen
//! by configuration. The gateway adds:
//!
//! - retry with exponential backoff, full jitter and retry-after handling
//! - lenient JSON extraction with a single repair round-trip
//! - per-call and per-project token accounting
//! - a local prompt-size safeguard

mod error;
mod gateway;
mod gemini;
mod json;
mod openai;
mod provider;
mod retry;
mod usage;

pub use error::{LlmError, LlmResult};
pub use gateway::{Completion, CompletionOptions, LlmConfig, LlmGateway, ProviderKind};
pub use gemini::GeminiProvider;
pub use json::extract_json;
pub use openai::OpenAiCompatProvider;
pub use provider::{ChatProvider, ChatResponse};
pub use retry::RetryPolicy;
pub use usage::{TokenLedger, TokenUsage};
