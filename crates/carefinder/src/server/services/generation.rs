//! Generation client for an OpenAI-compatible chat-completions endpoint

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One prompt sent to the language model
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
  /// System instructions including any assembled context
  pub system: String,
  /// The end-user message
  pub user: String,
  /// Cosmetic `user` label forwarded to the provider
  pub session_label: Option<String>,
}

impl GenerationRequest {
  pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
    Self { system: system.into(), user: user.into(), session_label: None }
  }

  pub fn with_session_label(mut self, label: &str) -> Self {
    self.session_label = Some(label.to_string());
    self
  }
}

/// Turns a prompt into free text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
  async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

/// Text returned to chat callers when the provider cannot be reached
pub fn fallback_message(found: usize) -> String {
  let records = if found == 1 { "record" } else { "records" };
  format!(
    "The language model is currently unavailable. I found {found} relevant facility {records}; \
     see the citations for details."
  )
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
  pub base_url: String,
  pub api_key: String,
  pub model: String,
  pub temperature: f32,
  pub max_tokens: u32,
  pub timeout: Duration,
}

impl ChatSettings {
  pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
}

pub struct OpenAiChatGenerator {
  client: reqwest::Client,
  settings: ChatSettings,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
  temperature: f32,
  max_tokens: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  user: Option<&'a str>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role: &'static str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
  #[serde(default)]
  content: Option<String>,
}

impl OpenAiChatGenerator {
  pub fn new(settings: ChatSettings) -> Result<Self> {
    if settings.api_key.trim().is_empty() {
      return Err(anyhow!("Chat generator requires an API key"));
    }

    let client = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, settings })
  }
}

#[async_trait]
impl Generator for OpenAiChatGenerator {
  async fn generate(&self, request: GenerationRequest) -> Result<String> {
    let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
    let body = ChatCompletionRequest {
      model: &self.settings.model,
      messages: vec![
        ChatMessage { role: "system", content: &request.system },
        ChatMessage { role: "user", content: &request.user },
      ],
      temperature: self.settings.temperature,
      max_tokens: self.settings.max_tokens,
      user: request.session_label.as_deref(),
    };

    let response = self
      .client
      .post(&url)
      .bearer_auth(&self.settings.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| anyhow!("Chat completion request failed: {}", e))?;

    if !response.status().is_success() {
      let status = response.status();
      let detail = response.text().await.unwrap_or_default();
      return Err(anyhow!("Chat provider returned {}: {}", status, detail));
    }

    let parsed: ChatCompletionResponse =
      response.json().await.map_err(|e| anyhow!("Failed to parse chat completion: {}", e))?;

    parsed
      .choices
      .into_iter()
      .next()
      .and_then(|choice| choice.message.content)
      .filter(|content| !content.trim().is_empty())
      .ok_or_else(|| anyhow!("Chat provider returned an empty completion"))
  }
}

/// Generator used when no provider is configured; every call fails
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
  async fn generate(&self, _request: GenerationRequest) -> Result<String> {
    Err(anyhow!("No language model provider is configured"))
  }
}
