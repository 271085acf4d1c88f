//! Reloadable monitor settings.
//!
//! Settings are read from a JSON file of the form `{"config": {...}}`. Every
//! option has a default, so a missing key never disables the monitor; it only
//! turns the dependent feature off.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::config::ConfigError;

/// Feeds polled when `urls` is absent from the settings file.
pub const DEFAULT_FEED_URLS: &[&str] = &[
    "https://lowendspirit.com/categories/offers/feed.rss",
    "https://lowendtalk.com/categories/offers/feed.rss",
];

/// Structural filter applied to comments before they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentFilter {
    /// Every comment passes.
    #[default]
    None,
    /// Only comments whose author shows a role other than "member".
    ByRole,
    /// Only comments written by the thread's creator.
    ByAuthor,
}

impl CommentFilter {
    /// Parse a settings value; blank means no filter.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "by_role" => Some(Self::ByRole),
            "by_author" => Some(Self::ByAuthor),
            _ => None,
        }
    }
}

fn deserialize_comment_filter<'de, D>(deserializer: D) -> Result<CommentFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(value) = raw else {
        return Ok(CommentFilter::None);
    };
    Ok(CommentFilter::parse(&value).unwrap_or_else(|| {
        warn!(
            value = %value,
            "Unknown comment_filter, expected 'by_role' or 'by_author'; comments are not filtered"
        );
        CommentFilter::None
    }))
}

fn default_frequency() -> u64 {
    600
}

fn default_feed_urls() -> Vec<String> {
    DEFAULT_FEED_URLS.iter().map(ToString::to_string).collect()
}

/// The options a sweep consults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Seconds to sleep between sweeps.
    #[serde(default = "default_frequency")]
    pub frequency: u64,
    /// Skip feed sources and only visit `extra_urls`.
    #[serde(default)]
    pub only_extra: bool,
    /// Feed sources.
    #[serde(default = "default_feed_urls")]
    pub urls: Vec<String>,
    /// Single discussion pages to watch.
    #[serde(default)]
    pub extra_urls: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_comment_filter")]
    pub comment_filter: CommentFilter,
    #[serde(default)]
    pub use_keywords_filter: bool,
    #[serde(default)]
    pub keywords_rule: String,
    #[serde(default)]
    pub use_ai_filter: bool,
    #[serde(default)]
    pub thread_prompt: Option<String>,
    #[serde(default)]
    pub comment_prompt: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            only_extra: false,
            urls: default_feed_urls(),
            extra_urls: Vec::new(),
            comment_filter: CommentFilter::None,
            use_keywords_filter: false,
            keywords_rule: String::new(),
            use_ai_filter: false,
            thread_prompt: None,
            comment_prompt: None,
        }
    }
}

#[derive(Deserialize)]
struct SettingsFile {
    #[serde(default)]
    config: Settings,
}

impl Settings {
    /// Parse settings from the JSON document format.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or holds invalid values.
    pub fn from_json(json: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<SettingsFile>(json)
            .map(|file| file.config)
            .map_err(|e| ConfigError::ParseSettings {
                path: origin.to_string(),
                source: e,
            })
    }

    /// Load settings from disk. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        match tokio::fs::read_to_string(path).await {
            Ok(json) => Self::from_json(&json, &shown),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %shown, "Settings file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::ReadSettings {
                path: shown,
                source: e,
            }),
        }
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.frequency)
    }
}
