//! Bearer credential resolution for the chat-completions endpoint.
//!
//! `LLM_API_KEY` is sent as-is. A GitHub Copilot access token is exchanged
//! for a short-lived bearer and cached. With neither configured, every call
//! fails with `LlmError::Auth` at the point of use.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::Config;
use crate::llm_client::LlmError;

pub const COPILOT_TOKEN_URL: &str = "https://api.github.com/copilot_internal/v2/token";

/// Exchanged tokens live for roughly half an hour; refresh well before that.
const TOKEN_TTL: Duration = Duration::from_secs(600);
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

pub const EDITOR_VERSION: &str = "vscode/1.104.0";
pub const EDITOR_PLUGIN_VERSION: &str = "copilot.vim/1.16.0";
pub const COPILOT_USER_AGENT: &str = "GithubCopilot/1.155.0";

#[derive(Debug, Clone)]
enum CredentialSource {
    ApiKey(String),
    Copilot {
        access_token: String,
        exchange_url: String,
    },
    Missing,
}

#[derive(Debug, Deserialize)]
struct CopilotToken {
    token: String,
}

struct CachedToken {
    token: String,
    fetched_at: Instant,
}

pub struct CredentialProvider {
    source: CredentialSource,
    client: Client,
    cache: Mutex<Option<CachedToken>>,
}

impl CredentialProvider {
    fn new(source: CredentialSource) -> Self {
        Self {
            source,
            client: Client::new(),
            cache: Mutex::new(None),
        }
    }

    /// A direct API key wins over the Copilot exchange.
    pub fn from_config(config: &Config) -> Self {
        match (&config.llm_api_key, &config.copilot_access_token) {
            (Some(key), _) => Self::api_key(key.clone()),
            (None, Some(token)) => Self::copilot(token.clone()),
            (None, None) => Self::missing(),
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self::new(CredentialSource::ApiKey(key.into()))
    }

    pub fn copilot(access_token: impl Into<String>) -> Self {
        Self::new(CredentialSource::Copilot {
            access_token: access_token.into(),
            exchange_url: COPILOT_TOKEN_URL.to_string(),
        })
    }

    pub fn missing() -> Self {
        Self::new(CredentialSource::Missing)
    }

    pub fn with_exchange_url(mut self, url: impl Into<String>) -> Self {
        if let CredentialSource::Copilot { exchange_url, .. } = &mut self.source {
            *exchange_url = url.into();
        }
        self
    }

    /// Copilot bearers must be accompanied by editor identification headers.
    pub fn is_copilot(&self) -> bool {
        matches!(self.source, CredentialSource::Copilot { .. })
    }

    pub async fn bearer(&self) -> Result<String, LlmError> {
        match &self.source {
            CredentialSource::ApiKey(key) => Ok(key.clone()),
            CredentialSource::Missing => Err(LlmError::Auth(
                "no model credential configured (set LLM_API_KEY or COPILOT_ACCESS_TOKEN)"
                    .to_string(),
            )),
            CredentialSource::Copilot {
                access_token,
                exchange_url,
            } => {
                let mut cache = self.cache.lock().await;
                if let Some(cached) = cache.as_ref() {
                    if cached.fetched_at.elapsed() < TOKEN_TTL {
                        return Ok(cached.token.clone());
                    }
                }

                let token = self.exchange(access_token, exchange_url).await?;
                *cache = Some(CachedToken {
                    token: token.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(token)
            }
        }
    }

    /// Drops a cached exchanged token after the endpoint rejected it.
    pub async fn invalidate(&self) {
        self.cache.lock().await.take();
    }

    async fn exchange(&self, access_token: &str, exchange_url: &str) -> Result<String, LlmError> {
        debug!("Exchanging Copilot access token for a session bearer");

        let response = self
            .client
            .get(exchange_url)
            .timeout(EXCHANGE_TIMEOUT)
            .header("authorization", format!("token {access_token}"))
            .header("editor-version", EDITOR_VERSION)
            .header("editor-plugin-version", EDITOR_PLUGIN_VERSION)
            .header("user-agent", COPILOT_USER_AGENT)
            .send()
            .await
            .map_err(|e| LlmError::Auth(format!("token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Auth(format!(
                "token exchange returned {status}: {body}"
            )));
        }

        let payload: CopilotToken = response
            .json()
            .await
            .map_err(|e| LlmError::Auth(format!("token exchange response unreadable: {e}")))?;
        if payload.token.trim().is_empty() {
            return Err(LlmError::Auth("token exchange returned an empty token".to_string()));
        }

        info!("Copilot session token refreshed");
        Ok(payload.token)
    }
}
