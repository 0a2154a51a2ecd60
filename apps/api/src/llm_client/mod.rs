/// LLM Client: the single point of entry for chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the model endpoint directly.
/// The pipeline talks to it only through the `Enhancer` trait.
///
/// Speaks the OpenAI-compatible `/chat/completions` protocol. Model name and
/// base URL come from `Config`; credentials from `CredentialProvider`.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

pub mod credentials;
pub mod prompts;

pub use credentials::CredentialProvider;

/// Language tags accepted on a fence that wraps the whole answer.
const MARKUP_FENCE_TAGS: &[&str] = &["", "markdown", "md", "html"];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Model authentication failed: {0}")]
    Auth(String),

    #[error("Model provider rate limited the request after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },

    #[error("Model call failed: {0}")]
    Model(String),

    #[error("LLM returned empty content")]
    EmptyResponse,
}

impl LlmError {
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Auth(_) => "AUTH_ERROR",
            LlmError::RateLimited { .. } => "RATE_LIMIT_ERROR",
            LlmError::Model(_) => "MODEL_ERROR",
            LlmError::EmptyResponse => "EMPTY_RESPONSE",
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Content of the first choice, if any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Enhanced CV markup returned by the model. Never blank.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancementResult {
    pub text: String,
    pub model: String,
    pub usage: Option<Usage>,
}

/// The enhancement seam. `LlmClient` is the production implementation;
/// tests substitute deterministic stand-ins.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(&self, prompt: &str) -> Result<EnhancementResult, LlmError>;
}

/// Chat-completions client with credential resolution and optional retries.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    model: String,
    credentials: Arc<CredentialProvider>,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.llm_timeout)
            .build()
            .map_err(|e| LlmError::Model(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.llm_base_url.trim_end_matches('/')),
            model: config.llm_model.clone(),
            credentials: Arc::new(CredentialProvider::from_config(config)),
            max_retries: config.llm_max_retries,
        })
    }

    pub fn with_credentials(mut self, credentials: CredentialProvider) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw chat-completion call, returning the full response object.
    /// 429, 5xx and transport failures are retried up to `max_retries` times
    /// with exponential backoff; auth failures never are.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<ChatResponse, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1).min(6)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let bearer = self.credentials.bearer().await?;
            let mut request = self
                .client
                .post(&self.endpoint)
                .bearer_auth(bearer)
                .json(&request_body);
            if self.credentials.is_copilot() {
                request = request
                    .header("editor-version", credentials::EDITOR_VERSION)
                    .header("editor-plugin-version", credentials::EDITOR_PLUGIN_VERSION)
                    .header("user-agent", credentials::COPILOT_USER_AGENT);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!("LLM transport error: {e}");
                    last_error = Some(LlmError::Model(format!("transport error: {e}")));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                warn!("LLM API returned {status}");
                last_error = Some(LlmError::RateLimited {
                    attempts: attempt + 1,
                });
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Model(format!("status {status}: {}", error_message(body))));
                continue;
            }

            if status.as_u16() == 401 || status.as_u16() == 403 {
                self.credentials.invalidate().await;
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Auth(format!("status {status}: {}", error_message(body))));
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Model(format!("status {status}: {}", error_message(body))));
            }

            let chat_response: ChatResponse = response
                .json()
                .await
                .map_err(|e| LlmError::Model(format!("malformed response body: {e}")))?;

            if let Some(usage) = chat_response.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            attempts: self.max_retries + 1,
        }))
    }
}

#[async_trait]
impl Enhancer for LlmClient {
    async fn enhance(&self, prompt: &str) -> Result<EnhancementResult, LlmError> {
        let response = self.call(prompt, prompts::CV_SPECIALIST_SYSTEM).await?;

        let text = response.text().unwrap_or_default();
        let text = strip_markup_fences(text);
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        info!(
            "CV enhancement completed successfully (length: {} chars)",
            text.len()
        );
        debug!(
            "Enhanced content preview: {}",
            text.chars().take(200).collect::<String>()
        );

        Ok(EnhancementResult {
            text: text.to_string(),
            model: self.model.clone(),
            usage: response.usage,
        })
    }
}

/// Prefers the provider's structured `error.message` over the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Strips a ```markdown / ```html / bare ``` fence wrapping the whole answer.
/// Fences with any other tag, or fenced blocks inside the answer, are kept.
pub fn strip_markup_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return text;
    };
    let (tag, body) = inner.split_once('\n').unwrap_or((inner, ""));
    // A fence line inside means the outer backticks belong to separate blocks.
    if body.lines().any(|line| line.trim_start().starts_with("```")) {
        return text;
    }
    if MARKUP_FENCE_TAGS.contains(&tag.trim().to_ascii_lowercase().as_str()) {
        body.trim()
    } else {
        text
    }
}
