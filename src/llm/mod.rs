//! LLM client for novel evaluation
//!
//! Talks to an OpenAI-compatible chat-completion endpoint (DeepSeek by
//! default). The free-form answer is turned into scores by [`extract`].

pub mod extract;
pub mod prompt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::error::LlmError;
use crate::utils::retry::{with_retry_if, RetryConfig};

pub use extract::{extract, extract_detailed, Extraction, ExtractionOutcome};
pub use prompt::{PromptBuilder, SYSTEM_PROMPT};

/// Configuration for LLM client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Bearer key; evaluation is skipped when absent
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Endpoint root (default: https://api.deepseek.com)
    pub endpoint: String,

    /// Model name to use (default: deepseek-chat)
    pub model: String,

    /// Temperature for generation
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retry attempts for transient failures
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.3,
            max_tokens: 1000,
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

impl LlmConfig {
    /// Full chat-completion URL; an endpoint that already names the route is used as is
    pub fn completions_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.ends_with("/chat/completions") {
            endpoint.to_string()
        } else {
            format!("{endpoint}/chat/completions")
        }
    }
}

/// A chat-completion backend
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send one system + user exchange and return the assistant text
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for the chat-completion endpoint
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
    retry: RetryConfig,
}

impl LlmClient {
    /// Create a new LLM client with custom config
    pub fn with_config(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.api_key.is_none() {
            tracing::warn!("LLM API key not set; evaluation will not work");
        }

        let retry = RetryConfig::new(config.max_retries).with_jitter(500);
        Ok(Self {
            client,
            config,
            retry,
        })
    }

    /// Override the backoff schedule
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn send_once(&self, api_key: &str, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "LLM API error");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl ChatCompletion for LlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.config.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "Sending evaluation request"
        );

        with_retry_if(
            &self.retry,
            || self.send_once(api_key, &request),
            LlmError::is_retryable,
        )
        .await
    }
}
