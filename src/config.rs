use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to read settings file {path}: {source}")]
    ReadSettings {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    ParseSettings {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Process-level configuration loaded from environment variables.
///
/// Everything a sweep may change at runtime lives in [`crate::settings::Settings`]
/// instead; this struct only holds paths, credentials and transport tuning.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_path: PathBuf,
    pub settings_path: PathBuf,

    // Fetching
    pub fetch_timeout: Duration,
    pub page_delay: Duration,

    // Classifier (OpenAI compatible)
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub ai_model: String,
    pub ai_timeout: Duration,

    // Telegram
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_path: PathBuf::from(env_or_default(
                "DATABASE_PATH",
                "./data/monitor.sqlite",
            )),
            settings_path: PathBuf::from(env_or_default("SETTINGS_PATH", "./data/config.json")),

            fetch_timeout: Duration::from_secs(parse_env_u64("FETCH_TIMEOUT_SECS", 30)?),
            page_delay: Duration::from_millis(parse_env_u64("PAGE_DELAY_MS", 1000)?),

            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_base_url: env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            ai_model: env_or_default("AI_MODEL", "gpt-4o-mini"),
            ai_timeout: Duration::from_secs(parse_env_u64("AI_TIMEOUT_SECS", 60)?),

            telegram_bot_token: optional_env("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: optional_env("TELEGRAM_CHAT_ID"),
            telegram_api_base: env_or_default("TELEGRAM_API_BASE", "https://api.telegram.org"),
        })
    }

    /// Configuration with fast timings and no credentials, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            database_path: PathBuf::from(":memory:"),
            settings_path: PathBuf::from("./config.json"),
            fetch_timeout: Duration::from_secs(5),
            page_delay: Duration::ZERO,
            openai_api_key: None,
            openai_base_url: "http://127.0.0.1:1/v1".to_string(),
            ai_model: "test-model".to_string(),
            ai_timeout: Duration::from_secs(5),
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_base: "http://127.0.0.1:1".to_string(),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.ai_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "AI_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.telegram_bot_token.is_some() != self.telegram_chat_id.is_some() {
            return Err(ConfigError::InvalidValue {
                name: "TELEGRAM_CHAT_ID".to_string(),
                message: "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together"
                    .to_string(),
            });
        }
        if url::Url::parse(&self.openai_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "OPENAI_BASE_URL".to_string(),
                message: format!("not a valid URL: '{}'", self.openai_base_url),
            });
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
