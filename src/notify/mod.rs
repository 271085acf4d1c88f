//! Outbound notifications. Delivery is best effort: a failed send is logged by
//! the caller and never retried.

mod format;

pub use format::{format_comment_notice, format_thread_notice};

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::Config;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one formatted message.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejected or never received the message.
    async fn send(&self, message: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Sends messages through the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Build a Telegram notifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text: message,
                disable_web_page_preview: true,
            })
            .send()
            .await
            .context("Failed to reach Telegram")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram sendMessage failed with status {status}: {body}");
        }
        Ok(())
    }
}

/// Writes notifications to the log. Used when no transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        info!(message = %message, "Notification");
        Ok(())
    }
}

/// Pick the notifier the configuration asks for.
///
/// # Errors
///
/// Returns an error if the Telegram client cannot be constructed.
pub fn from_config(config: &Config) -> Result<Arc<dyn Notifier>> {
    match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) => Ok(Arc::new(TelegramNotifier::new(
            &config.telegram_api_base,
            token,
            chat_id,
        )?)),
        _ => {
            info!("Telegram not configured, notifications will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}
