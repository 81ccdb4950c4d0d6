use anyhow::{bail, Context, Result};

use crate::generation::workflow::{DEFAULT_RETRY_LIMIT, MAX_RETRY_LIMIT};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing — read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Repair-loop budget: generator invocations per request.
    pub retry_limit: u32,
    /// Per-request timeout for the outbound model call, in seconds.
    pub llm_timeout_secs: u64,
    /// Figma export is enabled only when both of these are set.
    pub figma_access_token: Option<String>,
    pub figma_file_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let retry_limit = std::env::var("RETRY_LIMIT")
            .unwrap_or_else(|_| DEFAULT_RETRY_LIMIT.to_string())
            .parse::<u32>()
            .context("RETRY_LIMIT must be a positive integer")?;
        if retry_limit == 0 || retry_limit > MAX_RETRY_LIMIT {
            bail!("RETRY_LIMIT must be between 1 and {MAX_RETRY_LIMIT}");
        }

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            retry_limit,
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a positive integer")?,
            figma_access_token: std::env::var("FIGMA_ACCESS_TOKEN").ok(),
            figma_file_key: std::env::var("FIGMA_FILE_KEY").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Export runs only with both a token and a target file configured.
    pub fn figma_enabled(&self) -> bool {
        self.figma_access_token.is_some() && self.figma_file_key.is_some()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
