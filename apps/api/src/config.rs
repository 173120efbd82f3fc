use anyhow::{Context, Result};

use crate::gateway::backends::OPENAI_API_BASE;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the in-memory store (development only).
    pub redis_url: Option<String>,
    pub anthropic_api_key: String,
    /// Absent disables the OpenAI reviewer.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    /// Absent disables district filtering.
    pub district_service_url: Option<String>,
    /// Priority-ordered model ids for guide generation and ballot refresh.
    pub guide_models: Vec<String>,
    pub anthropic_audit_models: Vec<String>,
    pub openai_audit_models: Vec<String>,
    pub ballot_cooldown_hours: i64,
    pub audit_cooldown_hours: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            redis_url: std::env::var("REDIS_URL").ok(),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| OPENAI_API_BASE.to_string()),
            district_service_url: std::env::var("DISTRICT_SERVICE_URL").ok(),
            guide_models: csv_env(
                "GUIDE_MODELS",
                "claude-sonnet-4-5,claude-3-5-haiku-latest",
            ),
            anthropic_audit_models: csv_env("ANTHROPIC_AUDIT_MODELS", "claude-3-5-haiku-latest"),
            openai_audit_models: csv_env("OPENAI_AUDIT_MODELS", "gpt-4o-mini"),
            ballot_cooldown_hours: std::env::var("BALLOT_COOLDOWN_HOURS")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<i64>()
                .context("BALLOT_COOLDOWN_HOURS must be a number of hours")?,
            audit_cooldown_hours: std::env::var("AUDIT_COOLDOWN_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse::<i64>()
                .context("AUDIT_COOLDOWN_HOURS must be a number of hours")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Comma-separated list variable with a default.
fn csv_env(key: &str, default: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
