//! The chat completion gateway used by every LLM stage.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LlmError, LlmResult};
use crate::gemini::GeminiProvider;
use crate::json::extract_json;
use crate::openai::OpenAiCompatProvider;
use crate::provider::ChatProvider;
use crate::retry::{with_retry, RetryPolicy};
use crate::usage::{TokenLedger, TokenUsage};

/// Which backend the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions endpoint
    #[default]
    OpenAi,
    /// Gemini generateContent
    Gemini,
}

impl std::str::FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(LlmError::config(format!(
                "unknown api_provider '{}', expected 'openai' or 'gemini'",
                other
            ))),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Selected backend
    pub provider: ProviderKind,
    /// Endpoint base URL (OpenAI-compatible backends only)
    pub base_url: String,
    /// Provider API key
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Retry budget per call
    pub max_retries: u32,
    /// Per-call timeout
    pub timeout: Duration,
    /// Local prompt-size safeguard, in characters
    pub max_prompt_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_retries: 3,
            timeout: Duration::from_secs(30),
            max_prompt_chars: 24_000,
        }
    }
}

impl LlmConfig {
    /// Create config from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        let defaults = Self::default();
        let provider = match std::env::var("API_PROVIDER") {
            Ok(s) => s.parse()?,
            Err(_) => ProviderKind::OpenAi,
        };

        Ok(Self {
            provider,
            base_url: std::env::var("LLM_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("LLM_API_KEY").unwrap_or_default(),
            model: std::env::var("MODEL_NAME").unwrap_or(defaults.model),
            max_retries: std::env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            timeout: Duration::from_secs(
                std::env::var("TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_prompt_chars: std::env::var("MAX_PROMPT_CHARS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_prompt_chars),
        })
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionOptions {
    /// Require a JSON object/array in the output, repairing once on failure
    pub expect_json: bool,
    /// Override the gateway's retry budget
    pub max_retries: Option<u32>,
    /// Override the gateway's timeout
    pub timeout: Option<Duration>,
}

impl CompletionOptions {
    pub fn json() -> Self {
        Self {
            expect_json: true,
            ..Default::default()
        }
    }
}

/// A completed gateway call.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Raw model text
    pub text: String,
    /// Extracted JSON when `expect_json` was set
    pub json: Option<Value>,
    /// Combined usage, including any repair call
    pub usage: TokenUsage,
}

impl Completion {
    /// The extracted JSON, or `InvalidOutput` if the call did not request it.
    pub fn into_json(self) -> LlmResult<Value> {
        self.json
            .ok_or_else(|| LlmError::invalid_output("completion carried no JSON"))
    }
}

const REPAIR_INSTRUCTION: &str = "The previous response was not valid JSON. \
Return the same content as a single well-formed JSON value and nothing else. \
Previous response:\n";

/// Provider-agnostic chat completion gateway.
pub struct LlmGateway {
    provider: Arc<dyn ChatProvider>,
    timeout: Duration,
    policy: RetryPolicy,
    max_prompt_chars: usize,
    ledger: TokenLedger,
}

impl LlmGateway {
    /// Build a gateway from configuration, instantiating the selected
    /// provider.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::config("LLM_API_KEY is not set"));
        }

        let provider: Arc<dyn ChatProvider> = match config.provider {
            ProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::new(
                &config.base_url,
                &config.api_key,
                &config.model,
            )),
            ProviderKind::Gemini => {
                Arc::new(GeminiProvider::new(&config.api_key, &config.model))
            }
        };

        Ok(Self::with_provider(provider, config))
    }

    /// Build a gateway over an existing provider. Tests use this with a
    /// scripted mock.
    pub fn with_provider(provider: Arc<dyn ChatProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            timeout: config.timeout,
            policy: RetryPolicy::default().with_max_retries(config.max_retries),
            max_prompt_chars: config.max_prompt_chars,
            ledger: TokenLedger::new(),
        }
    }

    /// Token usage recorded for a project so far.
    pub fn project_usage(&self, project_id: &str) -> TokenUsage {
        self.ledger.project_total(project_id)
    }

    /// Drop a project's usage records.
    pub fn forget_project(&self, project_id: &str) {
        self.ledger.forget(project_id)
    }

    /// Issue a completion on behalf of a project.
    pub async fn complete(
        &self,
        project_id: &str,
        prompt: &str,
        options: CompletionOptions,
    ) -> LlmResult<Completion> {
        let chars = prompt.chars().count();
        if chars > self.max_prompt_chars {
            return Err(LlmError::TooLarge {
                chars,
                budget: self.max_prompt_chars,
            });
        }

        let timeout = options.timeout.unwrap_or(self.timeout);
        let policy = match options.max_retries {
            Some(n) => self.policy.clone().with_max_retries(n),
            None => self.policy.clone(),
        };

        let response = with_retry(&policy, self.provider.name(), || {
            self.provider.chat(prompt, timeout)
        })
        .await?;

        let mut usage = response.usage;
        self.ledger.record(project_id, response.usage);

        if !options.expect_json {
            return Ok(Completion {
                text: response.text,
                json: None,
                usage,
            });
        }

        if let Some(json) = extract_json(&response.text) {
            return Ok(Completion {
                text: response.text,
                json: Some(json),
                usage,
            });
        }

        // One repair round-trip, passing the malformed output back with a
        // fixed instruction.
        warn!(
            provider = self.provider.name(),
            "completion was not parseable JSON, issuing repair call"
        );
        let repair_prompt = format!("{}{}", REPAIR_INSTRUCTION, response.text);
        let repaired = with_retry(&policy, self.provider.name(), || {
            self.provider.chat(&repair_prompt, timeout)
        })
        .await?;

        usage = usage + repaired.usage;
        self.ledger.record(project_id, repaired.usage);

        match extract_json(&repaired.text) {
            Some(json) => {
                debug!("repair call produced valid JSON");
                Ok(Completion {
                    text: repaired.text,
                    json: Some(json),
                    usage,
                })
            }
            None => Err(LlmError::invalid_output(format!(
                "output unparseable after repair: {}",
                crate::openai::truncate(&repaired.text, 200)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted provider returning queued responses or errors.
    struct ScriptedProvider {
        script: Mutex<Vec<LlmResult<String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<LlmResult<String>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, prompt: &str, _timeout: Duration) -> LlmResult<crate::ChatResponse> {
            self.calls.lock().unwrap().push(prompt.to_string());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(LlmError::unavailable("script exhausted"));
            }
            script.remove(0).map(|text| crate::ChatResponse {
                usage: TokenUsage::new(10, 5),
                text,
            })
        }
    }

    fn gateway(script: Vec<LlmResult<String>>) -> (LlmGateway, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(script));
        let config = LlmConfig {
            api_key: "test".to_string(),
            max_retries: 1,
            ..Default::default()
        };
        (
            LlmGateway::with_provider(provider.clone(), &config),
            provider,
        )
    }

    #[tokio::test]
    async fn test_plain_completion() {
        let (gw, _) = gateway(vec![Ok("plain text".to_string())]);
        let c = gw
            .complete("p1", "prompt", CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(c.text, "plain text");
        assert!(c.json.is_none());
        assert_eq!(gw.project_usage("p1").total(), 15);
    }

    #[tokio::test]
    async fn test_json_extracted_without_repair() {
        let (gw, provider) = gateway(vec![Ok("```json\n{\"x\": 1}\n```".to_string())]);
        let c = gw
            .complete("p1", "prompt", CompletionOptions::json())
            .await
            .unwrap();
        assert_eq!(c.json.unwrap()["x"], 1);
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repair_call_fixes_output() {
        let (gw, provider) = gateway(vec![
            Ok("definitely not json".to_string()),
            Ok("{\"fixed\": true}".to_string()),
        ]);
        let c = gw
            .complete("p1", "prompt", CompletionOptions::json())
            .await
            .unwrap();
        assert_eq!(c.json.unwrap()["fixed"], true);

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].contains("definitely not json"));
        // Usage covers both calls.
        assert_eq!(gw.project_usage("p1").total(), 30);
    }

    #[tokio::test]
    async fn test_second_failure_is_invalid_output() {
        let (gw, _) = gateway(vec![
            Ok("garbage".to_string()),
            Ok("still garbage".to_string()),
        ]);
        let err = gw
            .complete("p1", "prompt", CompletionOptions::json())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_too_large_rejected_locally() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let config = LlmConfig {
            api_key: "test".to_string(),
            max_prompt_chars: 10,
            ..Default::default()
        };
        let gw = LlmGateway::with_provider(provider.clone(), &config);
        let err = gw
            .complete("p1", "a prompt well over ten characters", CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::TooLarge { .. }));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_retried() {
        let (gw, provider) = gateway(vec![
            Err(LlmError::unavailable("503")),
            Ok("recovered".to_string()),
        ]);
        let c = gw
            .complete("p1", "prompt", CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(c.text, "recovered");
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }
}
