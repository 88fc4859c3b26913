use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::prompt::{ChatMessage, CompletionRequest};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1/chat/completions";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("chat relay is not configured")]
    NotConfigured,
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream response was malformed: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, UpstreamError>;
}

#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub url: String,
}

pub fn from_config(config: UpstreamConfig) -> Arc<dyn Upstream> {
    match config.api_key.filter(|key| !key.trim().is_empty()) {
        Some(api_key) => Arc::new(OpenAiUpstream::new(api_key, config.model, config.url)),
        None => {
            warn!("no API key configured, chat relay disabled");
            Arc::new(UnconfiguredUpstream)
        }
    }
}

pub struct UnconfiguredUpstream;

#[async_trait]
impl Upstream for UnconfiguredUpstream {
    async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String, UpstreamError> {
        Err(UpstreamError::NotConfigured)
    }
}

/// Chat-completions style HTTP endpoint.
pub struct OpenAiUpstream {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiUpstream {
    pub fn new(api_key: String, model: String, url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            model,
            url,
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Upstream for OpenAiUpstream {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, UpstreamError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.2,
        };
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|error| UpstreamError::Malformed(error.to_string()))?;
        debug!(choices = parsed.choices.len(), "upstream answered");
        parse_reply(parsed)
    }
}

fn parse_reply(response: CompletionResponse) -> Result<String, UpstreamError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| UpstreamError::Malformed("no reply text".into()))
}
