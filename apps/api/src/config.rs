use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.githubcopilot.com";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4.1";

/// Application configuration loaded from environment variables.
///
/// The model credential is optional here on purpose: a missing credential
/// surfaces as an auth error on the first enhancement call, not at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub copilot_access_token: Option<String>,
    pub llm_max_retries: u32,
    pub llm_timeout: Duration,
    pub fetch_timeout: Duration,
    pub pdf_engine: String,
    pub pdf_timeout: Duration,
    /// `None` when `LOGO_PATH` is set to an empty string.
    pub logo_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let logo_path = match lookup("LOGO_PATH") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(PathBuf::from(v)),
            None => Some(PathBuf::from("assets/logo.svg")),
        };

        Ok(Config {
            llm_base_url: non_empty("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: non_empty("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_api_key: non_empty("LLM_API_KEY"),
            copilot_access_token: non_empty("COPILOT_ACCESS_TOKEN"),
            llm_max_retries: parse_or(&lookup, "LLM_MAX_RETRIES", 0)?,
            llm_timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 120)?),
            fetch_timeout: Duration::from_secs(parse_or(&lookup, "FETCH_TIMEOUT_SECS", 30)?),
            pdf_engine: non_empty("PDF_ENGINE").unwrap_or_else(|| "wkhtmltopdf".to_string()),
            pdf_timeout: Duration::from_secs(parse_or(&lookup, "PDF_TIMEOUT_SECS", 60)?),
            logo_path,
            output_dir: PathBuf::from(non_empty("OUTPUT_DIR").unwrap_or_else(|| "output".into())),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: non_empty("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.llm_api_key.is_some() || self.copilot_access_token.is_some()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        _ => Ok(default),
    }
}
