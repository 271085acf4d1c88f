//! AI classification of thread and comment text.
//!
//! Any OpenAI-compatible chat completions endpoint works. The filter stage
//! treats every [`ClassifierError`] as "filtered out".

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier is not configured")]
    NotConfigured,
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classifier returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("classifier response malformed: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Ask the model about `text` with `prompt` as the system message.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// unexpected response shape.
    async fn classify(&self, text: &str, prompt: &str) -> Result<String, ClassifierError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

/// Client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiClassifier {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClassifier {
    /// Build a classifier with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    /// Build a classifier from the process configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, ClassifierError> {
        Self::new(
            &config.openai_base_url,
            config.openai_api_key.clone(),
            &config.ai_model,
            config.ai_timeout,
        )
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{base}/chat/completions")
        }
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, text: &str, prompt: &str) -> Result<String, ClassifierError> {
        debug!(model = %self.model, "Classifying text");

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.7,
        };

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| ClassifierError::Malformed("missing choices[0].message.content".into()))?;

        Ok(truncate_at_end_marker(content).to_string())
    }
}

/// Classifier used when no API key is configured; always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClassifier;

#[async_trait]
impl Classifier for DisabledClassifier {
    async fn classify(&self, _text: &str, _prompt: &str) -> Result<String, ClassifierError> {
        Err(ClassifierError::NotConfigured)
    }
}

/// Models are prompted to finish with `END`; anything after it is discarded.
#[must_use]
pub fn truncate_at_end_marker(answer: &str) -> &str {
    answer.split("END").next().unwrap_or(answer)
}
